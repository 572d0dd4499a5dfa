//! 管理端认证处理器
//!
//! 提供管理员登录、登出、获取当前用户和刷新 Token 的 API

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::auth::{Claims, SCOPE_ADMIN, verify_password};
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 登录失败锁定阈值
const MAX_FAILED_ATTEMPTS: i32 = 5;
/// 锁定时长（分钟）
const LOCKOUT_MINUTES: i64 = 30;

// ============================================
// 请求/响应 DTO
// ============================================

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "用户名长度必须在 1-50 之间"))]
    pub username: String,
    #[validate(length(min = 1, max = 100, message = "密码长度必须在 1-100 之间"))]
    pub password: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUserDto,
    pub permissions: Vec<String>,
    pub expires_at: i64,
}

/// 当前用户响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user: AdminUserDto,
    pub permissions: Vec<String>,
    pub roles: Vec<RoleDto>,
}

/// Token 刷新响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

/// 系统用户 DTO
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserDto {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 角色 DTO
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

// ============================================
// 数据库模型
// ============================================

/// 数据库用户记录
#[derive(Debug, FromRow)]
struct AdminUserRow {
    id: i64,
    username: String,
    password_hash: String,
    email: Option<String>,
    display_name: Option<String>,
    status: String,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// 数据库角色记录
#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    code: String,
    name: String,
    description: Option<String>,
}

/// 数据库权限记录
#[derive(Debug, FromRow)]
struct PermissionRow {
    code: String,
}

/// 查询管理员的角色列表
async fn fetch_roles(pool: &sqlx::PgPool, user_id: i64) -> Result<Vec<RoleRow>> {
    let roles = sqlx::query_as(
        r#"
        SELECT r.id, r.code, r.name, r.description
        FROM roles r
        INNER JOIN user_roles ur ON r.id = ur.role_id
        WHERE ur.user_id = $1 AND r.enabled = TRUE
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// 查询管理员的权限编码列表
async fn fetch_permission_codes(pool: &sqlx::PgPool, user_id: i64) -> Result<Vec<String>> {
    let permissions: Vec<PermissionRow> = sqlx::query_as(
        r#"
        SELECT DISTINCT p.code
        FROM permissions p
        INNER JOIN role_permissions rp ON p.id = rp.permission_id
        INNER JOIN user_roles ur ON rp.role_id = ur.role_id
        WHERE ur.user_id = $1 AND p.enabled = TRUE
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(permissions.into_iter().map(|p| p.code).collect())
}

// ============================================
// API 处理器
// ============================================

/// 管理员登录
///
/// POST /api/admin/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let user: AdminUserRow = sqlx::query_as(
        r#"
        SELECT id, username, password_hash, email, display_name,
               status, failed_login_attempts, locked_until, last_login_at, created_at
        FROM admin_users
        WHERE username = $1
        "#,
    )
    .bind(&req.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

    if user.status == "disabled" {
        return Err(ApiError::AccountDisabled);
    }

    // 检查是否被锁定
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(ApiError::AccountLocked);
        }
    }

    // 验证密码，失败累计次数，连续失败后锁定
    let password_valid = verify_password(&req.password, &user.password_hash)?;
    if !password_valid {
        let new_attempts = user.failed_login_attempts + 1;
        let locked_until = if new_attempts >= MAX_FAILED_ATTEMPTS {
            Some(Utc::now() + chrono::Duration::minutes(LOCKOUT_MINUTES))
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE admin_users
            SET failed_login_attempts = $1, locked_until = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(new_attempts)
        .bind(locked_until)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

        return Err(ApiError::InvalidCredentials);
    }

    // 重置失败次数，更新最后登录时间
    sqlx::query(
        r#"
        UPDATE admin_users
        SET failed_login_attempts = 0, locked_until = NULL, last_login_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let roles = fetch_roles(&state.pool, user.id).await?;
    let role_codes: Vec<String> = roles.iter().map(|r| r.code.clone()).collect();
    let permission_codes = fetch_permission_codes(&state.pool, user.id).await?;

    let (token, expires_at) = state.jwt_manager.generate_token(
        user.id,
        &user.username,
        user.display_name.as_deref(),
        SCOPE_ADMIN,
        role_codes,
        permission_codes.clone(),
    )?;

    tracing::info!(user_id = user.id, username = %user.username, "Admin login");

    let response = LoginResponse {
        token,
        user: AdminUserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            status: user.status,
            last_login_at: Some(Utc::now()),
            created_at: user.created_at,
        },
        permissions: permission_codes,
        expires_at,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 管理员登出
///
/// POST /api/admin/auth/logout
pub async fn logout() -> Result<Json<ApiResponse<()>>> {
    // JWT 是无状态的，登出只需前端清除 Token
    Ok(Json(ApiResponse::success(())))
}

/// 获取当前管理员信息
///
/// GET /api/admin/auth/me
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<CurrentUserResponse>>> {
    let user_id = claims.user_id()?;

    let user: AdminUserRow = sqlx::query_as(
        r#"
        SELECT id, username, password_hash, email, display_name,
               status, failed_login_attempts, locked_until, last_login_at, created_at
        FROM admin_users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::UserNotFound(user_id.to_string()))?;

    let roles = fetch_roles(&state.pool, user_id).await?;
    let permissions = fetch_permission_codes(&state.pool, user_id).await?;

    let response = CurrentUserResponse {
        user: AdminUserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            status: user.status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        },
        permissions,
        roles: roles
            .iter()
            .map(|r| RoleDto {
                id: r.id,
                code: r.code.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
            })
            .collect(),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 刷新 Token
///
/// POST /api/admin/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let (token, expires_at) = state.jwt_manager.refresh_token(&claims)?;

    Ok(Json(ApiResponse::success(RefreshResponse {
        token,
        expires_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_username = LoginRequest {
            username: "".to_string(),
            password: "secret".to_string(),
        };
        assert!(empty_username.validate().is_err());
    }
}
