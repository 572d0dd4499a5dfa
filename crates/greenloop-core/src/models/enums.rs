//! 领域枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 环保行动分类
///
/// 用于目录展示和按类别的统计聚合
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ActionCategory {
    /// 绿色出行 - 骑行、公共交通、拼车等
    #[default]
    Transport,
    /// 节能 - 关灯、调温、设备待机管理等
    Energy,
    /// 减废 - 回收、自带杯、无纸化等
    Waste,
    /// 饮食 - 素食日、本地食材、光盘行动等
    Food,
    /// 节水
    Water,
    /// 社区 - 植树、清理、环保宣传等集体活动
    Community,
}

/// 环保行动状态（运营侧）
///
/// 控制行动是否对员工可见和可记录
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ActionStatus {
    /// 草稿 - 配置中，不对员工展示
    #[default]
    Draft,
    /// 已上线 - 正常展示，可记录
    Active,
    /// 已下线 - 停止记录，历史记录保留
    Inactive,
}

/// 行动记录状态
///
/// 追踪一条行动记录从提交到审核的生命周期
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum LogStatus {
    /// 待审核 - 等待管理员处理
    #[default]
    Pending,
    /// 已通过 - 积分和碳减排已入账
    Approved,
    /// 已驳回 - 不计入任何统计
    Rejected,
}

/// 挑战范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ChallengeScope {
    /// 个人挑战 - 每个参与者独立计算进度
    #[default]
    Individual,
    /// 团队挑战 - 按团队聚合进度
    Team,
    /// 全公司挑战 - 所有参与者共同累计
    Company,
}

/// 挑战目标指标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum ChallengeMetric {
    /// 累计积分
    #[default]
    Points,
    /// 行动次数
    ActionsCount,
    /// 碳减排量（克）
    Co2Saved,
}

/// 挑战状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// 草稿 - 配置中
    #[default]
    Draft,
    /// 进行中 - 可参与，进度累计
    Active,
    /// 已结束 - 时间窗口关闭，结果固定
    Completed,
    /// 已归档 - 历史数据，不展示
    Archived,
}

/// 徽章触发指标
///
/// 徽章在该指标首次达到阈值时授予
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum BadgeMetric {
    /// 累计积分
    #[default]
    TotalPoints,
    /// 已通过的行动记录数
    ActionsCount,
    /// 累计碳减排量（克）
    Co2SavedGrams,
    /// 完成的挑战数
    ChallengesCompleted,
    /// 连续打卡天数
    StreakDays,
}

/// 徽章状态（运营侧）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum BadgeStatus {
    /// 草稿 - 配置中，不参与评估
    #[default]
    Draft,
    /// 已上线 - 正常评估和授予
    Active,
    /// 已退役 - 停止授予，已获得的仍可展示
    Retired,
}

/// 内容类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ContentKind {
    /// 环保小贴士
    #[default]
    Tip,
    /// 文章
    Article,
    /// 公告
    Announcement,
}

/// 内容状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ContentStatus {
    /// 草稿
    #[default]
    Draft,
    /// 已发布
    Published,
    /// 已归档
    Archived,
}

/// 等级奖励状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum RewardStatus {
    /// 可领取
    #[default]
    Active,
    /// 已停用
    Inactive,
}

/// 奖励领取状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ClaimStatus {
    /// 已领取 - 等待发放
    #[default]
    Claimed,
    /// 已发放
    Fulfilled,
}

/// 员工账号状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum EmployeeStatus {
    /// 正常
    #[default]
    Active,
    /// 已禁用 - 无法登录，历史数据保留
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_category_serde_roundtrip() {
        let json = serde_json::to_string(&ActionCategory::Transport).unwrap();
        assert_eq!(json, "\"TRANSPORT\"");
        let back: ActionCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActionCategory::Transport);
    }

    #[test]
    fn test_log_status_default() {
        assert_eq!(LogStatus::default(), LogStatus::Pending);
    }

    #[test]
    fn test_badge_metric_wire_format() {
        // snake_case 是数据库存储格式，SCREAMING_SNAKE_CASE 是 JSON 格式
        let json = serde_json::to_string(&BadgeMetric::Co2SavedGrams).unwrap();
        assert_eq!(json, "\"CO2_SAVED_GRAMS\"");
    }
}
