//! 角色与权限管理 API 处理器（管理端）

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, CreateRoleRequest, UpdateRoleRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 权限 DTO
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub module: String,
}

/// 角色详情 DTO（带权限列表）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetailDto {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub permissions: Vec<PermissionDto>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    code: String,
    name: String,
    description: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

async fn fetch_role_permissions(pool: &sqlx::PgPool, role_id: i64) -> Result<Vec<PermissionDto>> {
    let permissions = sqlx::query_as(
        r#"
        SELECT p.id, p.code, p.name, p.module
        FROM permissions p
        INNER JOIN role_permissions rp ON p.id = rp.permission_id
        WHERE rp.role_id = $1
        ORDER BY p.module, p.code
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

async fn replace_role_permissions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role_id: i64,
    permission_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut **tx)
        .await?;

    for permission_id in permission_ids {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn role_detail(pool: &sqlx::PgPool, row: RoleRow) -> Result<RoleDetailDto> {
    let permissions = fetch_role_permissions(pool, row.id).await?;
    Ok(RoleDetailDto {
        id: row.id,
        code: row.code,
        name: row.name,
        description: row.description,
        enabled: row.enabled,
        permissions,
        created_at: row.created_at,
    })
}

/// 获取角色列表
///
/// GET /api/admin/roles
pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RoleDetailDto>>>> {
    let rows: Vec<RoleRow> = sqlx::query_as(
        "SELECT id, code, name, description, enabled, created_at FROM roles ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await?;

    let mut roles = Vec::with_capacity(rows.len());
    for row in rows {
        roles.push(role_detail(&state.pool, row).await?);
    }

    Ok(Json(ApiResponse::success(roles)))
}

/// 获取角色详情
///
/// GET /api/admin/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RoleDetailDto>>> {
    let row: RoleRow = sqlx::query_as(
        "SELECT id, code, name, description, enabled, created_at FROM roles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("角色 {} 不存在", id)))?;

    Ok(Json(ApiResponse::success(
        role_detail(&state.pool, row).await?,
    )))
}

/// 创建角色
///
/// POST /api/admin/roles
pub async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<Json<ApiResponse<RoleDetailDto>>> {
    req.validate()?;

    let duplicate: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM roles WHERE code = $1)")
        .bind(&req.code)
        .fetch_one(&state.pool)
        .await?;
    if duplicate.0 {
        return Err(ApiError::Validation("角色编码已存在".to_string()));
    }

    let mut tx = state.pool.begin().await?;

    let row: RoleRow = sqlx::query_as(
        r#"
        INSERT INTO roles (code, name, description, enabled, created_at, updated_at)
        VALUES ($1, $2, $3, TRUE, NOW(), NOW())
        RETURNING id, code, name, description, enabled, created_at
        "#,
    )
    .bind(&req.code)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&mut *tx)
    .await?;

    replace_role_permissions(&mut tx, row.id, &req.permission_ids).await?;

    tx.commit().await?;

    info!(role_id = row.id, code = %row.code, "Role created");

    Ok(Json(ApiResponse::success(
        role_detail(&state.pool, row).await?,
    )))
}

/// 更新角色
///
/// PUT /api/admin/roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<RoleDetailDto>>> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(ApiError::NotFound(format!("角色 {} 不存在", id)));
    }

    let mut tx = state.pool.begin().await?;

    let row: RoleRow = sqlx::query_as(
        r#"
        UPDATE roles
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, code, name, description, enabled, created_at
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(permission_ids) = &req.permission_ids {
        replace_role_permissions(&mut tx, id, permission_ids).await?;
    }

    tx.commit().await?;

    info!(role_id = id, "Role updated");

    Ok(Json(ApiResponse::success(
        role_detail(&state.pool, row).await?,
    )))
}

/// 删除角色
///
/// 仍有用户绑定的角色不可删除
///
/// DELETE /api/admin/roles/{id}
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let in_use: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM user_roles WHERE role_id = $1)")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if in_use.0 {
        return Err(ApiError::Validation(
            "角色仍有用户绑定，无法删除".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("角色 {} 不存在", id)));
    }

    tx.commit().await?;

    info!(role_id = id, "Role deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 获取权限全集
///
/// GET /api/admin/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PermissionDto>>>> {
    let permissions: Vec<PermissionDto> = sqlx::query_as(
        "SELECT id, code, name, module FROM permissions WHERE enabled = TRUE ORDER BY module, code",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(permissions)))
}
