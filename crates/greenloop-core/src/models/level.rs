//! 等级奖励相关实体定义
//!
//! 等级阈值本身见 `crate::level::LevelThreshold`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ClaimStatus, RewardStatus};

/// 等级奖励
///
/// 达到指定等级后可领取的福利，stock 为空表示不限量
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LevelReward {
    pub id: i64,
    /// 解锁所需等级
    pub level: i32,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    /// 剩余库存，为空表示不限量
    #[sqlx(default)]
    pub stock: Option<i32>,
    pub status: RewardStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 奖励领取记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardClaim {
    pub id: i64,
    pub reward_id: i64,
    pub employee_id: i64,
    pub status: ClaimStatus,
    pub claimed_at: DateTime<Utc>,
}
