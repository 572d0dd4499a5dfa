//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use chrono::{DateTime, NaiveDate, Utc};
use greenloop_core::{
    ActionCategory, ActionStatus, BadgeMetric, BadgeStatus, ChallengeMetric, ChallengeScope,
    ChallengeStatus, ContentKind, ContentStatus, LogStatus, RewardStatus,
};
use serde::Deserialize;
use validator::Validate;

/// 分页查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    /// 计算数据库查询的 offset
    ///
    /// 基于截断后的每页条数计算，保证翻页连续且 offset 永不为负
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0) * self.limit()
    }

    /// 获取限制条数（最大100）
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

// ============================================
// 员工端请求
// ============================================

/// 提交行动记录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionLogRequest {
    pub action_id: i64,
    #[validate(length(max = 500, message = "备注长度不能超过500个字符"))]
    pub note: Option<String>,
    /// 行动发生日期，缺省为当天
    pub logged_on: Option<NaiveDate>,
}

/// 行动记录查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogFilter {
    pub status: Option<LogStatus>,
    pub action_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// 行动目录查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFilter {
    pub category: Option<ActionCategory>,
    pub status: Option<ActionStatus>,
    pub keyword: Option<String>,
}

// ============================================
// 管理端：行动目录
// ============================================

/// 创建环保行动请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionRequest {
    #[validate(length(min = 1, max = 100, message = "行动名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub category: ActionCategory,
    #[validate(range(min = 1, max = 10000, message = "积分必须在1-10000之间"))]
    pub points: i32,
    #[validate(range(min = 0, message = "CO2 减排量不能为负"))]
    pub co2_saved_grams: i32,
    #[serde(default)]
    pub requires_approval: bool,
}

/// 更新环保行动请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActionRequest {
    #[validate(length(min = 1, max = 100, message = "行动名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ActionCategory>,
    #[validate(range(min = 1, max = 10000, message = "积分必须在1-10000之间"))]
    pub points: Option<i32>,
    #[validate(range(min = 0, message = "CO2 减排量不能为负"))]
    pub co2_saved_grams: Option<i32>,
    pub requires_approval: Option<bool>,
}

// ============================================
// 管理端：审核
// ============================================

/// 审核通过/驳回请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[validate(length(max = 500, message = "审核意见长度不能超过500个字符"))]
    pub review_note: Option<String>,
}

// ============================================
// 管理端：挑战
// ============================================

/// 创建挑战请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 100, message = "挑战名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub scope: ChallengeScope,
    pub metric: ChallengeMetric,
    #[validate(range(min = 1, message = "目标值必须为正数"))]
    pub target_value: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// 更新挑战请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChallengeRequest {
    #[validate(length(min = 1, max = 100, message = "挑战名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "目标值必须为正数"))]
    pub target_value: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// 挑战查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeFilter {
    pub scope: Option<ChallengeScope>,
    pub status: Option<ChallengeStatus>,
    pub keyword: Option<String>,
}

// ============================================
// 管理端：徽章
// ============================================

/// 创建徽章请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBadgeRequest {
    #[validate(length(min = 1, max = 100, message = "徽章名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub metric: BadgeMetric,
    #[validate(range(min = 1, message = "阈值必须为正数"))]
    pub threshold: i64,
}

/// 更新徽章请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBadgeRequest {
    #[validate(length(min = 1, max = 100, message = "徽章名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub metric: Option<BadgeMetric>,
    #[validate(range(min = 1, message = "阈值必须为正数"))]
    pub threshold: Option<i64>,
    pub status: Option<BadgeStatus>,
}

// ============================================
// 管理端：等级与奖励
// ============================================

/// 创建/更新等级阈值请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLevelRequest {
    #[validate(range(min = 1, max = 100, message = "等级必须在1-100之间"))]
    pub level: i32,
    #[validate(length(min = 1, max = 50, message = "等级名称长度必须在1-50个字符之间"))]
    pub name: String,
    #[validate(range(min = 0, message = "所需积分不能为负"))]
    pub points_required: i64,
}

/// 创建等级奖励请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    #[validate(range(min = 1, max = 100, message = "解锁等级必须在1-100之间"))]
    pub level: i32,
    #[validate(length(min = 1, max = 100, message = "奖励名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    /// 为空表示不限量
    #[validate(range(min = 0, message = "库存不能为负"))]
    pub stock: Option<i32>,
}

/// 更新等级奖励请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardRequest {
    #[validate(range(min = 1, max = 100, message = "解锁等级必须在1-100之间"))]
    pub level: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "奖励名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "库存不能为负"))]
    pub stock: Option<i32>,
    pub status: Option<RewardStatus>,
}

// ============================================
// 管理端：内容
// ============================================

/// 创建内容请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub kind: ContentKind,
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, message = "正文不能为空"))]
    pub body: String,
}

/// 更新内容请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    pub kind: Option<ContentKind>,
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "正文不能为空"))]
    pub body: Option<String>,
}

/// 内容查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub status: Option<ContentStatus>,
    pub keyword: Option<String>,
}

// ============================================
// 管理端：团队
// ============================================

/// 创建团队请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "团队名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub description: Option<String>,
}

/// 更新团队请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "团队名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

// ============================================
// 管理端：员工与系统用户
// ============================================

/// 员工查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    pub keyword: Option<String>,
    pub department: Option<String>,
    pub team_id: Option<i64>,
    pub status: Option<String>,
}

/// 创建系统用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSystemUserRequest {
    #[validate(length(min = 3, max = 50, message = "用户名长度必须在3-50个字符之间"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "密码长度必须在8-100个字符之间"))]
    pub password: String,
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role_ids: Vec<i64>,
}

/// 更新系统用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSystemUserRequest {
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub role_ids: Option<Vec<i64>>,
}

/// 重置密码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, max = 100, message = "密码长度必须在8-100个字符之间"))]
    pub new_password: String,
}

/// 创建角色请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "角色编码长度必须在1-50个字符之间"))]
    pub code: String,
    #[validate(length(min = 1, max = 50, message = "角色名称长度必须在1-50个字符之间"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// 更新角色请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 50, message = "角色名称长度必须在1-50个字符之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<i64>>,
}

// ============================================
// 管理端：操作日志与统计
// ============================================

/// 操作日志查询过滤
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogFilter {
    pub operator_id: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// 排行榜参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: i64,
}

fn default_leaderboard_limit() -> i64 {
    10
}

impl Default for LeaderboardParams {
    fn default() -> Self {
        Self {
            limit: default_leaderboard_limit(),
        }
    }
}

impl LeaderboardParams {
    /// 限制返回条数（最大100）
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
    }

    #[test]
    fn test_pagination_offset() {
        let params = PaginationParams {
            page: 3,
            page_size: 10,
        };
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_pagination_offset_edge_cases() {
        // page 为 0 时，offset 应该为 0
        let params = PaginationParams {
            page: 0,
            page_size: 10,
        };
        assert_eq!(params.offset(), 0);

        // page_size 超过上限时截断为 100
        let params = PaginationParams {
            page: 1,
            page_size: 200,
        };
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_pagination_offset_uses_clamped_page_size() {
        // offset 必须和 limit 使用同一个截断值，否则翻页会跳行
        let params = PaginationParams {
            page: 2,
            page_size: 1000,
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 100);
    }

    #[test]
    fn test_pagination_offset_never_negative() {
        let params = PaginationParams {
            page: 2,
            page_size: -5,
        };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.offset(), 1);

        let params = PaginationParams {
            page: -3,
            page_size: 0,
        };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_create_action_request_validation() {
        let valid = CreateActionRequest {
            name: "骑行通勤".to_string(),
            description: None,
            category: ActionCategory::Transport,
            points: 20,
            co2_saved_grams: 2500,
            requires_approval: false,
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateActionRequest {
            name: "".to_string(), // 空名称
            description: None,
            category: ActionCategory::Transport,
            points: 20,
            co2_saved_grams: 2500,
            requires_approval: false,
        };
        assert!(invalid.validate().is_err());

        let negative_points = CreateActionRequest {
            name: "骑行通勤".to_string(),
            description: None,
            category: ActionCategory::Transport,
            points: 0,
            co2_saved_grams: 2500,
            requires_approval: false,
        };
        assert!(negative_points.validate().is_err());
    }

    #[test]
    fn test_create_challenge_request_validation() {
        use chrono::TimeZone;
        let invalid = CreateChallengeRequest {
            name: "六月骑行月".to_string(),
            description: None,
            scope: ChallengeScope::Individual,
            metric: ChallengeMetric::ActionsCount,
            target_value: 0, // 非法目标
            starts_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_action_log_note_length_limit() {
        let too_long = CreateActionLogRequest {
            action_id: 1,
            note: Some("x".repeat(501)),
            logged_on: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_leaderboard_params_clamped() {
        let params = LeaderboardParams { limit: 500 };
        assert_eq!(params.limit(), 100);
        let params = LeaderboardParams { limit: 0 };
        assert_eq!(params.limit(), 1);
    }
}
