//! 统一错误处理模块
//!
//! 定义各 crate 共享的基础错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统基础错误类型
#[derive(Debug, Error)]
pub enum GreenLoopError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("记录已存在: {entity} {field}={value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    // ==================== 业务逻辑错误 ====================
    #[error("积分不足: 需要 {required}, 实际 {actual}")]
    InsufficientPoints { required: i64, actual: i64 },

    #[error("挑战不在进行中: challenge_id={challenge_id}")]
    ChallengeNotActive { challenge_id: i64 },

    #[error("奖励不可领取: {reason}")]
    RewardUnavailable { reason: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 权限错误 ====================
    #[error("未授权访问")]
    Unauthorized,

    #[error("权限不足: {operation}")]
    Forbidden { operation: String },

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),

    #[error("{0}")]
    Custom(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, GreenLoopError>;

impl GreenLoopError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::ChallengeNotActive { .. } => "CHALLENGE_NOT_ACTIVE",
            Self::RewardUnavailable { .. } => "REWARD_UNAVAILABLE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Custom(_) => "CUSTOM_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 目前仅数据库连接类故障视为可重试，业务错误重试无意义。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = GreenLoopError::NotFound {
            entity: "EcoAction".to_string(),
            id: "123".to_string(),
        };
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_is_retryable() {
        let db_err = GreenLoopError::Database(sqlx::Error::PoolTimedOut);
        assert!(db_err.is_retryable());

        let not_found = GreenLoopError::NotFound {
            entity: "Badge".to_string(),
            id: "123".to_string(),
        };
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_display_contains_context() {
        let err = GreenLoopError::InsufficientPoints {
            required: 500,
            actual: 120,
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("120"));
    }
}
