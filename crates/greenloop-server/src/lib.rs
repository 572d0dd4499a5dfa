//! GreenLoop 服务端
//!
//! 企业员工环保行为激励平台的 REST API 服务，
//! 员工端和管理端共用一个进程，按路由前缀区分。
//!
//! ## 核心功能
//!
//! - **行动记录**：员工记录环保行动，免审行动即时入账，其余进入审核队列
//! - **积分与等级**：审核通过入账积分和碳减排，等级按阈值表实时计算
//! - **挑战**：时间盒目标，支持个人/团队/全公司三种范围
//! - **徽章**：指标阈值触发，审核入账时自动评估授予
//! - **管理端**：目录/挑战/徽章/内容运营，审核，员工管理，RBAC，统计报表
//! - **操作日志**：管理端写操作自动落审计日志
//!
//! ## 模块结构
//!
//! - `auth`: JWT 签发校验和密码哈希
//! - `dto`: 请求和响应的数据传输对象
//! - `models`: 服务端特有的实体模型
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证、作用域、权限和审计中间件
//! - `routes`: 路由配置
//! - `worker`: 挑战生命周期后台 Worker
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod worker;

// 重新导出核心类型
pub use dto::{
    ApiResponse, CreateActionLogRequest, CreateActionRequest, CreateChallengeRequest,
    OperationLogDto, PageResponse, PaginationParams, StatsOverview,
};
pub use error::{ApiError, Result};
pub use models::OperationLog;

// 从 greenloop-core 重新导出领域模型，便于下游直接使用
pub use greenloop_core::{
    ActionLog, Badge, Challenge, ContentItem, EcoAction, Employee, LevelProgress, LevelReward,
    LevelThreshold, Team,
};
