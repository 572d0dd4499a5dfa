//! 权限检查中间件
//!
//! 管理端路由的作用域和权限校验

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

use crate::auth::Claims;

/// 管理端作用域中间件
///
/// 全局挂载，仅对 /api/admin 前缀生效，拒绝员工 Token 访问管理接口
pub async fn require_admin_scope(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path();

    if !path.starts_with("/api/admin") {
        return next.run(request).await;
    }

    // 管理端登录自身不要求已有 Token
    if path.starts_with("/api/admin/auth/login") {
        return next.run(request).await;
    }

    match request.extensions().get::<Claims>() {
        Some(claims) if claims.is_admin() => next.run(request).await,
        Some(_) => forbidden_response("需要管理端身份"),
        None => unauthorized_response("未认证"),
    }
}

/// 权限检查中间件工厂
///
/// 创建一个检查指定权限的中间件函数
///
/// # 示例
/// ```ignore
/// .layer(axum::middleware::from_fn(require_permission("system:user:read")))
/// ```
pub fn require_permission(
    permission: &'static str,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Clone + Send {
    move |request: Request<Body>, next: Next| {
        let permission = permission;
        Box::pin(async move { check_permission(request, next, permission).await })
    }
}

/// 检查用户是否拥有指定权限
async fn check_permission(
    request: Request<Body>,
    next: Next,
    required_permission: &str,
) -> Response {
    // 从请求扩展中获取 Claims（由 auth_middleware 注入）
    let claims = match request.extensions().get::<Claims>() {
        Some(claims) => claims.clone(),
        None => {
            return unauthorized_response("未认证");
        }
    };

    if !claims.is_admin() {
        return forbidden_response("需要管理端身份");
    }

    // admin 角色拥有所有权限
    if claims.roles.iter().any(|r| r == "admin") {
        return next.run(request).await;
    }

    if has_permission(&claims.permissions, required_permission) {
        return next.run(request).await;
    }

    forbidden_response(&format!("缺少权限: {}", required_permission))
}

/// 权限匹配，支持两段前缀的通配符（如 content:action:* 匹配 content:action:write）
pub fn has_permission(granted: &[String], required: &str) -> bool {
    if granted.iter().any(|p| p == required) {
        return true;
    }

    let parts: Vec<&str> = required.split(':').collect();
    if parts.len() >= 2 {
        let wildcard = format!("{}:{}:*", parts[0], parts[1]);
        if granted.contains(&wildcard) {
            return true;
        }
    }

    false
}

/// 生成 401 未授权响应
fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

/// 生成 403 禁止访问响应
fn forbidden_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "FORBIDDEN",
        "message": message,
        "data": null
    });

    (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_permission_matching() {
        let permissions = vec![
            "system:user:read".to_string(),
            "content:action:write".to_string(),
        ];

        assert!(has_permission(&permissions, "system:user:read"));
        assert!(!has_permission(&permissions, "system:user:write"));
    }

    #[test]
    fn test_wildcard_permission_matching() {
        let permissions = vec!["approval:log:*".to_string()];

        assert!(has_permission(&permissions, "approval:log:approve"));
        assert!(has_permission(&permissions, "approval:log:reject"));
        assert!(!has_permission(&permissions, "content:action:write"));
    }

    #[test]
    fn test_readonly_grants_cannot_satisfy_write_codes() {
        // 只读角色持有的授权集合不能命中任何写入类权限码
        let granted = vec![
            "content:action:read".to_string(),
            "content:challenge:read".to_string(),
            "system:user:read".to_string(),
            "analytics:report:read".to_string(),
        ];

        for required in [
            "content:action:write",
            "content:challenge:write",
            "system:user:write",
            "approval:log:approve",
            "approval:log:reject",
            "employee:team:write",
        ] {
            assert!(!has_permission(&granted, required), "{}", required);
        }
    }

    #[test]
    fn test_single_segment_permission_has_no_wildcard() {
        let permissions = vec!["analytics:*".to_string()];
        // 通配符只按「模块:资源:*」展开，单段权限不匹配
        assert!(!has_permission(&permissions, "analytics"));
    }
}
