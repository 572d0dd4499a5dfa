//! 徽章相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{BadgeMetric, BadgeStatus};

/// 徽章
///
/// 单一阈值条件：指定指标首次达到 threshold 时授予
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    #[sqlx(default)]
    pub icon_url: Option<String>,
    pub metric: BadgeMetric,
    pub threshold: i64,
    pub status: BadgeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 员工已获得的徽章
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeBadge {
    pub id: i64,
    pub employee_id: i64,
    pub badge_id: i64,
    pub earned_at: DateTime<Utc>,
}
