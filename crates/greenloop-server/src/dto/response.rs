//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构

use chrono::{DateTime, NaiveDate, Utc};
use greenloop_core::{
    ActionCategory, BadgeMetric, BadgeStatus, ChallengeMetric, ChallengeScope, ChallengeStatus,
    LevelProgress, LogStatus,
};
use serde::{Deserialize, Serialize};

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    /// 创建分页响应
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }

    /// 创建空分页响应
    pub fn empty(page: i64, page_size: i64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
        }
    }
}

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（无数据）
    pub fn success_empty() -> ApiResponse<()> {
        ApiResponse {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 员工简要信息 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub department: Option<String>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub total_points: i64,
    pub total_co2_saved_grams: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// 个人主页 DTO
///
/// 聚合积分、减排量、等级进度和徽章数量
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub employee: EmployeeDto,
    pub level: LevelProgress,
    pub badges_earned: i64,
    pub actions_approved: i64,
    pub pending_logs: i64,
}

/// 行动记录 DTO（带行动名称）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogDto {
    pub id: i64,
    pub action_id: i64,
    pub action_name: String,
    pub category: ActionCategory,
    pub note: Option<String>,
    pub logged_on: NaiveDate,
    pub status: LogStatus,
    pub points_awarded: Option<i32>,
    pub co2_awarded_grams: Option<i32>,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 待审核记录 DTO（管理端，带员工信息）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLogDto {
    pub id: i64,
    pub employee_id: i64,
    pub employee_name: String,
    pub action_id: i64,
    pub action_name: String,
    pub category: ActionCategory,
    pub points: i32,
    pub co2_saved_grams: i32,
    pub note: Option<String>,
    pub logged_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// 员工端徽章 DTO（带获得标记）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeWithEarnedDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub metric: BadgeMetric,
    pub threshold: i64,
    pub earned: bool,
    pub earned_at: Option<DateTime<Utc>>,
}

/// 团队概览 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub total_points: i64,
    pub total_co2_saved_grams: i64,
    pub created_at: DateTime<Utc>,
}

/// 团队成员 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberDto {
    pub id: i64,
    pub display_name: String,
    pub department: Option<String>,
    pub total_points: i64,
    pub total_co2_saved_grams: i64,
}

/// 团队详情 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetailDto {
    #[serde(flatten)]
    pub team: TeamDto,
    pub members: Vec<TeamMemberDto>,
}

/// 挑战 DTO（带进度）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub scope: ChallengeScope,
    pub metric: ChallengeMetric,
    pub target_value: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ChallengeStatus,
    pub participant_count: i64,
    /// 当前调用方（个人或其团队）的进度，未参加时为空
    pub my_progress: Option<i64>,
    pub my_progress_percent: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 员工端奖励 DTO（带解锁/领取状态）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardWithStateDto {
    pub id: i64,
    pub level: i32,
    pub name: String,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub unlocked: bool,
    pub claimed: bool,
}

/// 等级列表响应（阈值表 + 调用方位置）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelsDto {
    pub levels: Vec<greenloop_core::LevelThreshold>,
    pub me: LevelProgress,
}

/// 操作日志响应 DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogDto {
    pub id: i64,
    pub operator_id: String,
    pub operator_name: Option<String>,
    pub module: String,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 统计概览
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_employees: i64,
    pub active_employees: i64,
    pub total_actions_logged: i64,
    pub total_actions_approved: i64,
    pub pending_approvals: i64,
    pub total_points_awarded: i64,
    pub total_co2_saved_grams: i64,
    pub active_challenges: i64,
}

/// 月度趋势数据点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    /// 形如 2025-06 的月份
    pub month: String,
    pub actions_count: i64,
    pub points_awarded: i64,
    pub co2_saved_grams: i64,
}

/// 类别分布数据点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDistributionDto {
    pub category: String,
    pub count: i64,
    pub percentage: f64,
}

/// 排行榜条目（员工）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRankingDto {
    pub rank: i64,
    pub employee_id: i64,
    pub display_name: String,
    pub department: Option<String>,
    pub total_points: i64,
    pub total_co2_saved_grams: i64,
}

/// 排行榜条目（团队）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRankingDto {
    pub rank: i64,
    pub team_id: i64,
    pub team_name: String,
    pub member_count: i64,
    pub total_points: i64,
    pub total_co2_saved_grams: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_response_new() {
        let items = vec![1, 2, 3];
        let response = PageResponse::new(items, 100, 2, 10);

        assert_eq!(response.total, 100);
        assert_eq!(response.page, 2);
        assert_eq!(response.page_size, 10);
        assert_eq!(response.total_pages, 10);
        assert_eq!(response.items.len(), 3);
    }

    #[test]
    fn test_page_response_total_pages_calculation() {
        // 恰好整除
        let response = PageResponse::<i32>::new(vec![], 100, 1, 10);
        assert_eq!(response.total_pages, 10);

        // 有余数
        let response = PageResponse::<i32>::new(vec![], 101, 1, 10);
        assert_eq!(response.total_pages, 11);

        // 空数据
        let response = PageResponse::<i32>::empty(1, 10);
        assert_eq!(response.total_pages, 0);
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.code, "SUCCESS");
        assert_eq!(response.data, Some("test data"));
    }

    #[test]
    fn test_api_response_serialization() {
        let response = ApiResponse::success(serde_json::json!({ "id": 123 }));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"id\":123"));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let dto = EmployeeRankingDto {
            rank: 1,
            employee_id: 7,
            display_name: "张伟".to_string(),
            department: None,
            total_points: 500,
            total_co2_saved_grams: 12000,
        };
        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("\"employeeId\":7"));
        assert!(json.contains("\"totalCo2SavedGrams\":12000"));
    }
}
