//! 服务端错误类型定义
//!
//! 包含员工端和管理端 API 的全部错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("账号已被禁用")]
    AccountDisabled,
    #[error("账号已被锁定，请稍后重试")]
    AccountLocked,
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源不存在
    #[error("员工不存在: {0}")]
    EmployeeNotFound(i64),
    #[error("团队不存在: {0}")]
    TeamNotFound(i64),
    #[error("环保行动不存在: {0}")]
    ActionNotFound(i64),
    #[error("行动记录不存在: {0}")]
    LogNotFound(i64),
    #[error("挑战不存在: {0}")]
    ChallengeNotFound(i64),
    #[error("徽章不存在: {0}")]
    BadgeNotFound(i64),
    #[error("等级不存在: {0}")]
    LevelNotFound(i32),
    #[error("奖励不存在: {0}")]
    RewardNotFound(i64),
    #[error("内容不存在: {0}")]
    ContentNotFound(i64),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务错误
    #[error("行动未上线，无法记录")]
    ActionNotActive,
    #[error("同一行动同一天只能记录一次")]
    DuplicateLog,
    #[error("该记录已审核，无法重复操作")]
    LogNotPending,
    #[error("挑战不可加入: {0}")]
    ChallengeNotJoinable(String),
    #[error("已加入该挑战")]
    AlreadyJoined,
    #[error("该奖励已领取过")]
    AlreadyClaimed,
    #[error("等级不足，需要等级 {required}，当前等级 {actual}")]
    LevelTooLow { required: i32, actual: i32 },
    #[error("奖励库存不足")]
    RewardOutOfStock,
    #[error("奖励未上架")]
    RewardInactive,
    #[error("资源已发布，无法删除")]
    AlreadyPublished,

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 认证错误
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::AccountDisabled | Self::AccountLocked => {
                StatusCode::FORBIDDEN
            }
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,

            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::EmployeeNotFound(_)
            | Self::TeamNotFound(_)
            | Self::ActionNotFound(_)
            | Self::LogNotFound(_)
            | Self::ChallengeNotFound(_)
            | Self::BadgeNotFound(_)
            | Self::LevelNotFound(_)
            | Self::RewardNotFound(_)
            | Self::ContentNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::ActionNotActive
            | Self::DuplicateLog
            | Self::LogNotPending
            | Self::ChallengeNotJoinable(_)
            | Self::AlreadyJoined
            | Self::AlreadyClaimed
            | Self::LevelTooLow { .. }
            | Self::RewardOutOfStock
            | Self::RewardInactive
            | Self::AlreadyPublished => StatusCode::CONFLICT,

            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::UserNotFound(_) => "USER_NOT_FOUND",

            Self::Validation(_) => "VALIDATION_ERROR",

            Self::EmployeeNotFound(_) => "EMPLOYEE_NOT_FOUND",
            Self::TeamNotFound(_) => "TEAM_NOT_FOUND",
            Self::ActionNotFound(_) => "ACTION_NOT_FOUND",
            Self::LogNotFound(_) => "LOG_NOT_FOUND",
            Self::ChallengeNotFound(_) => "CHALLENGE_NOT_FOUND",
            Self::BadgeNotFound(_) => "BADGE_NOT_FOUND",
            Self::LevelNotFound(_) => "LEVEL_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::ContentNotFound(_) => "CONTENT_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",

            Self::ActionNotActive => "ACTION_NOT_ACTIVE",
            Self::DuplicateLog => "DUPLICATE_LOG",
            Self::LogNotPending => "LOG_NOT_PENDING",
            Self::ChallengeNotJoinable(_) => "CHALLENGE_NOT_JOINABLE",
            Self::AlreadyJoined => "ALREADY_JOINED",
            Self::AlreadyClaimed => "ALREADY_CLAIMED",
            Self::LevelTooLow { .. } => "LEVEL_TOO_LOW",
            Self::RewardOutOfStock => "REWARD_OUT_OF_STOCK",
            Self::RewardInactive => "REWARD_INACTIVE",
            Self::AlreadyPublished => "ALREADY_PUBLISHED",

            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 从共享层错误转换
impl From<greenloop_shared::error::GreenLoopError> for ApiError {
    fn from(err: greenloop_shared::error::GreenLoopError) -> Self {
        use greenloop_shared::error::GreenLoopError;
        match err {
            GreenLoopError::Database(e) => Self::Database(e),
            GreenLoopError::NotFound { entity, id } => Self::NotFound(format!("{} {}", entity, id)),
            GreenLoopError::Validation(msg) => Self::Validation(msg),
            GreenLoopError::Unauthorized => Self::Unauthorized("未授权访问".to_string()),
            GreenLoopError::Forbidden { operation } => Self::Forbidden(operation),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// 构造所有可简单构造的错误变体及其期望的 (StatusCode, error_code) 映射。
    /// 表驱动方式保证新增变体时只需在一处维护。
    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            // 认证 & 权限类
            (ApiError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Forbidden("no permission".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (ApiError::AccountDisabled, StatusCode::FORBIDDEN, "ACCOUNT_DISABLED"),
            (ApiError::AccountLocked, StatusCode::FORBIDDEN, "ACCOUNT_LOCKED"),
            (ApiError::UserNotFound("alice".into()), StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            // 参数校验
            (ApiError::Validation("name is required".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            // 资源不存在类：前端依赖 404 做条件跳转
            (ApiError::EmployeeNotFound(1), StatusCode::NOT_FOUND, "EMPLOYEE_NOT_FOUND"),
            (ApiError::TeamNotFound(2), StatusCode::NOT_FOUND, "TEAM_NOT_FOUND"),
            (ApiError::ActionNotFound(3), StatusCode::NOT_FOUND, "ACTION_NOT_FOUND"),
            (ApiError::LogNotFound(4), StatusCode::NOT_FOUND, "LOG_NOT_FOUND"),
            (ApiError::ChallengeNotFound(5), StatusCode::NOT_FOUND, "CHALLENGE_NOT_FOUND"),
            (ApiError::BadgeNotFound(6), StatusCode::NOT_FOUND, "BADGE_NOT_FOUND"),
            (ApiError::LevelNotFound(7), StatusCode::NOT_FOUND, "LEVEL_NOT_FOUND"),
            (ApiError::RewardNotFound(8), StatusCode::NOT_FOUND, "REWARD_NOT_FOUND"),
            (ApiError::ContentNotFound(9), StatusCode::NOT_FOUND, "CONTENT_NOT_FOUND"),
            (ApiError::NotFound("some resource".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            // 业务冲突类：409 表示请求合法但与当前状态冲突
            (ApiError::ActionNotActive, StatusCode::CONFLICT, "ACTION_NOT_ACTIVE"),
            (ApiError::DuplicateLog, StatusCode::CONFLICT, "DUPLICATE_LOG"),
            (ApiError::LogNotPending, StatusCode::CONFLICT, "LOG_NOT_PENDING"),
            (ApiError::ChallengeNotJoinable("not active".into()), StatusCode::CONFLICT, "CHALLENGE_NOT_JOINABLE"),
            (ApiError::AlreadyJoined, StatusCode::CONFLICT, "ALREADY_JOINED"),
            (ApiError::AlreadyClaimed, StatusCode::CONFLICT, "ALREADY_CLAIMED"),
            (ApiError::LevelTooLow { required: 5, actual: 2 }, StatusCode::CONFLICT, "LEVEL_TOO_LOW"),
            (ApiError::RewardOutOfStock, StatusCode::CONFLICT, "REWARD_OUT_OF_STOCK"),
            (ApiError::RewardInactive, StatusCode::CONFLICT, "REWARD_INACTIVE"),
            (ApiError::AlreadyPublished, StatusCode::CONFLICT, "ALREADY_PUBLISHED"),
            // 系统级错误：统一 500
            (ApiError::Internal("unexpected state".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    /// 状态码错误会导致前端误判请求结果，需要逐一验证
    #[test]
    fn test_all_variants_status_code() {
        for (error, expected_status, label) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "状态码不匹配: variant={label}"
            );
        }
    }

    /// 错误码是 API 契约的一部分，任何变更都是破坏性变更，必须逐一锁定
    #[test]
    fn test_all_variants_error_code() {
        for (error, _status, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "错误码不匹配: expected={expected_code}"
            );
        }
    }

    /// Display 输出直接作为 API 响应的 message 字段返回，
    /// 必须包含关键上下文（如 ID），否则用户无法定位问题
    #[test]
    fn test_display_contains_context() {
        assert!(ApiError::Unauthorized("expired".into()).to_string().contains("expired"));
        assert!(ApiError::EmployeeNotFound(42).to_string().contains("42"));
        assert!(ApiError::ChallengeNotFound(7).to_string().contains("7"));
        assert!(ApiError::Validation("email invalid".into()).to_string().contains("email invalid"));
        let msg = ApiError::LevelTooLow { required: 5, actual: 2 }.to_string();
        assert!(msg.contains('5') && msg.contains('2'));
    }

    /// IntoResponse 是错误到 HTTP 响应的最终出口，
    /// 验证状态码和响应体四字段结构（success/code/message/data）
    #[tokio::test]
    async fn test_into_response_body_structure() {
        let test_cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (ApiError::ActionNotFound(3), StatusCode::NOT_FOUND, "ACTION_NOT_FOUND"),
            (ApiError::RewardOutOfStock, StatusCode::CONFLICT, "REWARD_OUT_OF_STOCK"),
            (ApiError::LogNotPending, StatusCode::CONFLICT, "LOG_NOT_PENDING"),
            (ApiError::Internal("crash".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];

        for (error, expected_status, expected_code) in test_cases {
            let label = format!("{:?}", error);
            let response = error.into_response();

            assert_eq!(response.status(), expected_status, "响应状态码不匹配: {label}");

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

            assert_eq!(body["success"], json!(false), "success 字段应为 false: {label}");
            assert_eq!(body["code"], json!(expected_code), "code 字段不匹配: {label}");
            assert!(!body["message"].as_str().unwrap_or("").is_empty(), "message 不应为空: {label}");
            assert!(body["data"].is_null(), "data 字段应为 null: {label}");
        }
    }

    /// 系统级错误的响应消息不应泄露内部细节，只返回通用提示
    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let response = ApiError::Internal("stack overflow at module X".into()).into_response();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        let message = body["message"].as_str().unwrap();

        assert!(!message.contains("stack overflow"), "系统错误消息泄露了内部细节: {message}");
        assert!(message.contains("服务内部错误"), "系统错误应返回通用提示: {message}");
    }

    /// 业务错误的响应消息应保留原始描述，帮助用户理解问题
    #[tokio::test]
    async fn test_business_errors_preserve_display_message() {
        let response = ApiError::ChallengeNotJoinable("挑战已结束".into()).into_response();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("挑战已结束"));
    }

    /// validator 转换必须把字段级错误信息带入 ApiError
    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("length");
        field_error.message = Some("备注长度不能超过 500 个字符".into());
        errors.add("note", field_error);

        let api_error: ApiError = errors.into();
        match &api_error {
            ApiError::Validation(msg) => {
                assert!(msg.contains("note"), "转换后应保留字段名: {msg}");
            }
            other => panic!("期望 Validation 变体，实际: {:?}", other),
        }
        assert_eq!(api_error.status_code(), StatusCode::BAD_REQUEST);
    }

    /// sqlx::Error 通过 #[from] 自动派生，验证转换后类型和状态码正确
    #[test]
    fn test_from_sqlx_error() {
        let api_err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(api_err, ApiError::Database(_)));
        assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_err.error_code(), "DATABASE_ERROR");
    }
}
