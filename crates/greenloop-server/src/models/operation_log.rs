//! 操作日志模型
//!
//! 管理端运营操作的审计日志实体

use chrono::{DateTime, Utc};

/// 操作日志实体
///
/// 记录管理端所有运营操作，用于审计追溯
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperationLog {
    pub id: i64,
    /// 操作人 ID
    pub operator_id: String,
    /// 操作人名称（冗余存储，便于查询展示）
    pub operator_name: Option<String>,
    /// 操作模块（actions、challenges、approvals 等）
    pub module: String,
    /// 操作动作（create、update、approve 等）
    pub action: String,
    /// 操作目标类型
    pub target_type: Option<String>,
    /// 操作目标 ID
    pub target_id: Option<String>,
    /// 操作者 IP 地址
    pub ip_address: Option<String>,
    /// 客户端 User-Agent
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OperationLog {
    /// 构建新的操作日志
    pub fn new(
        operator_id: impl Into<String>,
        module: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            operator_id: operator_id.into(),
            operator_name: None,
            module: module.into(),
            action: action.into(),
            target_type: None,
            target_id: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    /// 设置操作人名称
    pub fn with_operator_name(mut self, name: impl Into<String>) -> Self {
        self.operator_name = Some(name.into());
        self
    }

    /// 设置操作目标
    pub fn with_target(
        mut self,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.into());
        self
    }

    /// 设置客户端信息
    pub fn with_client_info(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_log_builder() {
        let log = OperationLog::new("admin001", "approvals", "approve")
            .with_operator_name("管理员")
            .with_target("approval", "123")
            .with_client_info(Some("192.168.1.1".to_string()), None);

        assert_eq!(log.operator_id, "admin001");
        assert_eq!(log.operator_name, Some("管理员".to_string()));
        assert_eq!(log.module, "approvals");
        assert_eq!(log.action, "approve");
        assert_eq!(log.target_type, Some("approval".to_string()));
        assert_eq!(log.target_id, Some("123".to_string()));
        assert_eq!(log.ip_address, Some("192.168.1.1".to_string()));
    }
}
