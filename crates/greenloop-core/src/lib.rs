//! GreenLoop 领域核心库
//!
//! 包含与存储和传输无关的领域模型和业务计算：
//!
//! - `models`: 实体模型和枚举（员工、团队、环保行动、挑战、徽章、等级、内容）
//! - `level`: 等级与升级进度计算
//! - `criteria`: 徽章获取条件评估
//! - `progress`: 挑战进度计算
//!
//! 所有计算均为纯函数，每次请求实时重算，不做缓存。

pub mod criteria;
pub mod level;
pub mod models;
pub mod progress;

// 重新导出核心类型
pub use criteria::{BadgeEvaluator, MetricSnapshot};
pub use level::{LevelProgress, LevelThreshold, compute_level_progress};
pub use models::enums::{
    ActionCategory, ActionStatus, BadgeMetric, BadgeStatus, ChallengeMetric, ChallengeScope,
    ChallengeStatus, ClaimStatus, ContentKind, ContentStatus, EmployeeStatus, LogStatus,
    RewardStatus,
};
pub use models::{
    ActionLog, Badge, Challenge, ChallengeParticipant, ContentItem, EcoAction, Employee,
    EmployeeBadge, LevelReward, RewardClaim, Team,
};
pub use progress::challenge_progress_percent;
