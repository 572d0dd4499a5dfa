//! 环保行动目录与行动记录实体定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ActionCategory, ActionStatus, LogStatus};

/// 环保行动（目录项）
///
/// 由管理员维护的可记录行动定义，包含积分值和碳减排值
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EcoAction {
    pub id: i64,
    pub category: ActionCategory,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    /// 单次记录可获得的积分
    pub points: i32,
    /// 单次记录对应的碳减排量（克）
    pub co2_saved_grams: i32,
    /// 是否需要管理员审核后才入账
    pub requires_approval: bool,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 行动记录
///
/// 员工提交的一次行动。积分和碳减排在审核通过时按行动定义
/// 的当前值快照到 `points_awarded` / `co2_awarded_grams`，
/// 之后目录修改不影响历史记录。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub id: i64,
    pub employee_id: i64,
    pub action_id: i64,
    #[sqlx(default)]
    pub note: Option<String>,
    /// 行动发生日期（员工填写，用于挑战窗口归属和连续打卡计算）
    pub logged_on: NaiveDate,
    pub status: LogStatus,
    #[sqlx(default)]
    pub points_awarded: Option<i32>,
    #[sqlx(default)]
    pub co2_awarded_grams: Option<i32>,
    #[sqlx(default)]
    pub reviewer_id: Option<i64>,
    #[sqlx(default)]
    pub review_note: Option<String>,
    #[sqlx(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
