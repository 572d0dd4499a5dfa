//! 员工与团队实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::EmployeeStatus;

/// 员工
///
/// `total_points` 和 `total_co2_saved_grams` 为已通过审核的行动累计值，
/// 在审核通过时递增，作为等级计算和排行榜的依据。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// 密码哈希（bcrypt），序列化时跳过
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(default)]
    pub display_name: Option<String>,
    #[sqlx(default)]
    pub department: Option<String>,
    /// 所属团队，未加入时为空
    #[sqlx(default)]
    pub team_id: Option<i64>,
    /// 累计积分
    pub total_points: i64,
    /// 累计碳减排量（克）
    pub total_co2_saved_grams: i64,
    pub status: EmployeeStatus,
    pub failed_login_attempts: i32,
    #[sqlx(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 团队
///
/// 团队积分不落库，展示时由成员累计值实时聚合。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
