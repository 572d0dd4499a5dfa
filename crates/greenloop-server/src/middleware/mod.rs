//! HTTP 中间件
//!
//! 认证、权限检查和审计日志中间件

pub mod audit;
pub mod auth;
pub mod permission;

pub use audit::audit_middleware;
pub use auth::auth_middleware;
pub use permission::{require_admin_scope, require_permission};
