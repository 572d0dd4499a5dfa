//! 系统用户管理 API 处理器（管理端）
//!
//! 管理端账号的 CRUD、角色分配和密码重置

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use super::auth::{AdminUserDto, RoleDto};
use crate::{
    auth::hash_password,
    dto::{
        ApiResponse, CreateSystemUserRequest, PageResponse, PaginationParams,
        ResetPasswordRequest, UpdateSystemUserRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

/// 系统用户列表项（带角色）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUserDto {
    #[serde(flatten)]
    pub user: AdminUserDto,
    pub roles: Vec<RoleDto>,
}

#[derive(Debug, FromRow)]
struct SystemUserRow {
    id: i64,
    username: String,
    email: Option<String>,
    display_name: Option<String>,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SystemUserRow> for AdminUserDto {
    fn from(row: SystemUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            status: row.status,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        }
    }
}

async fn fetch_user_roles(pool: &sqlx::PgPool, user_id: i64) -> Result<Vec<RoleDto>> {
    let roles: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT r.id, r.code, r.name, r.description
        FROM roles r
        INNER JOIN user_roles ur ON r.id = ur.role_id
        WHERE ur.user_id = $1
        ORDER BY r.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(roles
        .into_iter()
        .map(|(id, code, name, description)| RoleDto {
            id,
            code,
            name,
            description,
        })
        .collect())
}

/// 替换用户的角色绑定
async fn replace_user_roles(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: i64,
    role_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    for role_id in role_ids {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// 获取系统用户列表（分页）
///
/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<SystemUserDto>>>> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
        .fetch_one(&state.pool)
        .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let rows = sqlx::query_as::<_, SystemUserRow>(
        r#"
        SELECT id, username, email, display_name, status, last_login_at, created_at
        FROM admin_users
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let roles = fetch_user_roles(&state.pool, row.id).await?;
        items.push(SystemUserDto {
            user: row.into(),
            roles,
        });
    }

    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取系统用户详情
///
/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SystemUserDto>>> {
    let row: SystemUserRow = sqlx::query_as(
        r#"
        SELECT id, username, email, display_name, status, last_login_at, created_at
        FROM admin_users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::UserNotFound(id.to_string()))?;

    let roles = fetch_user_roles(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(SystemUserDto {
        user: row.into(),
        roles,
    })))
}

/// 创建系统用户
///
/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateSystemUserRequest>,
) -> Result<Json<ApiResponse<SystemUserDto>>> {
    req.validate()?;

    let duplicate: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM admin_users WHERE username = $1)")
            .bind(&req.username)
            .fetch_one(&state.pool)
            .await?;
    if duplicate.0 {
        return Err(ApiError::Validation("用户名已存在".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let mut tx = state.pool.begin().await?;

    let row: SystemUserRow = sqlx::query_as(
        r#"
        INSERT INTO admin_users (username, password_hash, email, display_name,
                                 status, failed_login_attempts, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'active', 0, NOW(), NOW())
        RETURNING id, username, email, display_name, status, last_login_at, created_at
        "#,
    )
    .bind(&req.username)
    .bind(&password_hash)
    .bind(&req.email)
    .bind(&req.display_name)
    .fetch_one(&mut *tx)
    .await?;

    replace_user_roles(&mut tx, row.id, &req.role_ids).await?;

    tx.commit().await?;

    info!(user_id = row.id, username = %row.username, "System user created");

    let roles = fetch_user_roles(&state.pool, row.id).await?;
    Ok(Json(ApiResponse::success(SystemUserDto {
        user: row.into(),
        roles,
    })))
}

/// 更新系统用户
///
/// PUT /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSystemUserRequest>,
) -> Result<Json<ApiResponse<SystemUserDto>>> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM admin_users WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(ApiError::UserNotFound(id.to_string()));
    }

    let status = req.status.as_ref().map(|s| s.to_lowercase());

    let mut tx = state.pool.begin().await?;

    let row: SystemUserRow = sqlx::query_as(
        r#"
        UPDATE admin_users
        SET email = COALESCE($2, email),
            display_name = COALESCE($3, display_name),
            status = COALESCE($4, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, username, email, display_name, status, last_login_at, created_at
        "#,
    )
    .bind(id)
    .bind(&req.email)
    .bind(&req.display_name)
    .bind(&status)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(role_ids) = &req.role_ids {
        replace_user_roles(&mut tx, id, role_ids).await?;
    }

    tx.commit().await?;

    info!(user_id = id, "System user updated");

    let roles = fetch_user_roles(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(SystemUserDto {
        user: row.into(),
        roles,
    })))
}

/// 重置系统用户密码
///
/// POST /api/admin/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    let password_hash = hash_password(&req.new_password)?;

    let result = sqlx::query(
        r#"
        UPDATE admin_users
        SET password_hash = $2, failed_login_attempts = 0, locked_until = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&password_hash)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::UserNotFound(id.to_string()));
    }

    info!(user_id = id, "System user password reset");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 删除系统用户
///
/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let mut tx = state.pool.begin().await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM admin_users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::UserNotFound(id.to_string()));
    }

    tx.commit().await?;

    info!(user_id = id, "System user deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}
