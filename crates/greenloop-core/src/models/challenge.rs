//! 挑战相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ChallengeMetric, ChallengeScope, ChallengeStatus};

/// 挑战
///
/// 时间盒目标：在 [starts_at, ends_at) 窗口内将指定指标累计到 target_value
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub scope: ChallengeScope,
    pub metric: ChallengeMetric,
    pub target_value: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ChallengeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 挑战参与记录
///
/// 个人挑战时 employee_id 有值；团队挑战时 team_id 有值。
/// progress 在行动审核通过时递增，completed_at 在达标时落盘。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeParticipant {
    pub id: i64,
    pub challenge_id: i64,
    #[sqlx(default)]
    pub employee_id: Option<i64>,
    #[sqlx(default)]
    pub team_id: Option<i64>,
    pub progress: i64,
    #[sqlx(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}
