//! 员工端认证处理器
//!
//! 员工登录、登出、获取当前身份和刷新 Token。
//! 与管理端共用同一套 JWT 配置，Token scope 为 employee。

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::auth::{Claims, SCOPE_EMPLOYEE, verify_password};
use crate::dto::ApiResponse;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 登录失败锁定阈值
const MAX_FAILED_ATTEMPTS: i32 = 5;
/// 锁定时长（分钟）
const LOCKOUT_MINUTES: i64 = 30;

/// 员工登录请求（用户名或邮箱）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeLoginRequest {
    #[validate(length(min = 1, max = 100, message = "账号长度必须在 1-100 之间"))]
    pub account: String,
    #[validate(length(min = 1, max = 100, message = "密码长度必须在 1-100 之间"))]
    pub password: String,
}

/// 员工登录响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeLoginResponse {
    pub token: String,
    pub user: EmployeeIdentityDto,
    pub expires_at: i64,
}

/// 员工身份 DTO
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeIdentityDto {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub department: Option<String>,
    pub team_id: Option<i64>,
}

/// Token 刷新响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

/// 数据库员工记录（认证所需字段）
#[derive(Debug, FromRow)]
struct EmployeeAuthRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    display_name: String,
    department: Option<String>,
    team_id: Option<i64>,
    status: String,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
}

/// 员工登录
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<EmployeeLoginRequest>,
) -> Result<Json<ApiResponse<EmployeeLoginResponse>>> {
    req.validate()?;

    // 账号可以是用户名或邮箱
    let user: EmployeeAuthRow = sqlx::query_as(
        r#"
        SELECT id, email, username, password_hash, display_name, department,
               team_id, status, failed_login_attempts, locked_until
        FROM employees
        WHERE username = $1 OR email = $1
        "#,
    )
    .bind(&req.account)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

    if user.status == "disabled" {
        return Err(ApiError::AccountDisabled);
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(ApiError::AccountLocked);
        }
    }

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
            UPDATE employees
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

    sqlx::query(
        r#"
        UPDATE employees
        SET failed_login_attempts = 0, locked_until = NULL, last_login_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let (token, expires_at) = state.jwt_manager.generate_token(
        user.id,
        &user.username,
        Some(&user.display_name),
        SCOPE_EMPLOYEE,
        vec![],
        vec![],
    )?;

    tracing::info!(employee_id = user.id, username = %user.username, "Employee login");

    let response = EmployeeLoginResponse {
        token,
        user: EmployeeIdentityDto {
            id: user.id,
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            department: user.department,
            team_id: user.team_id,
        },
        expires_at,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 员工登出
///
/// POST /api/auth/logout
pub async fn logout() -> Result<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::success(())))
}

/// 获取当前员工身份
///
/// GET /api/auth/me
pub async fn get_current_employee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<EmployeeIdentityDto>>> {
    let employee_id = claims.user_id()?;

    let row: Option<(i64, String, String, String, Option<String>, Option<i64>)> = sqlx::query_as(
        r#"
        SELECT id, email, username, display_name, department, team_id
        FROM employees
        WHERE id = $1 AND status = 'active'
        "#,
    )
    .bind(employee_id)
    .fetch_optional(&state.pool)
    .await?;

    let (id, email, username, display_name, department, team_id) =
        row.ok_or(ApiError::EmployeeNotFound(employee_id))?;

    Ok(Json(ApiResponse::success(EmployeeIdentityDto {
        id,
        email,
        username,
        display_name,
        department,
        team_id,
    })))
}

/// 刷新 Token
///
/// POST /api/auth/refresh
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
        let valid = EmployeeLoginRequest {
            account: "zhang.wei@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty = EmployeeLoginRequest {
            account: "".to_string(),
            password: "secret".to_string(),
        };
        assert!(empty.validate().is_err());
    }
}
