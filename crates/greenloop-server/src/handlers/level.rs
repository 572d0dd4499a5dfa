//! 等级 API 处理器
//!
//! 员工端的等级表与本人进度，管理端的阈值维护

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use greenloop_core::{LevelThreshold, compute_level_progress};
use tracing::info;
use validator::Validate;

use crate::{
    auth::Claims,
    dto::{ApiResponse, LevelsDto, UpsertLevelRequest},
    error::{ApiError, Result},
    state::AppState,
};

async fn fetch_thresholds(pool: &sqlx::PgPool) -> Result<Vec<LevelThreshold>> {
    let thresholds = sqlx::query_as(
        "SELECT level, name, points_required FROM levels ORDER BY points_required",
    )
    .fetch_all(pool)
    .await?;
    Ok(thresholds)
}

// ============================================
// 员工端
// ============================================

/// 获取等级表与本人进度
///
/// GET /api/levels
pub async fn list_levels_for_employee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<LevelsDto>>> {
    let employee_id = claims.user_id()?;

    let (points,): (i64,) = sqlx::query_as("SELECT total_points FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::EmployeeNotFound(employee_id))?;

    let levels = fetch_thresholds(&state.pool).await?;
    let me = compute_level_progress(points, &levels);

    Ok(Json(ApiResponse::success(LevelsDto { levels, me })))
}

// ============================================
// 管理端
// ============================================

/// 获取等级阈值表
///
/// GET /api/admin/levels
pub async fn list_levels(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LevelThreshold>>>> {
    let levels = fetch_thresholds(&state.pool).await?;
    Ok(Json(ApiResponse::success(levels)))
}

/// 创建或更新等级阈值
///
/// 以等级号为键 upsert，阈值表始终保持每级一条
///
/// PUT /api/admin/levels
pub async fn upsert_level(
    State(state): State<AppState>,
    Json(req): Json<UpsertLevelRequest>,
) -> Result<Json<ApiResponse<LevelThreshold>>> {
    req.validate()?;

    let level: LevelThreshold = sqlx::query_as(
        r#"
        INSERT INTO levels (level, name, points_required)
        VALUES ($1, $2, $3)
        ON CONFLICT (level)
        DO UPDATE SET name = EXCLUDED.name, points_required = EXCLUDED.points_required
        RETURNING level, name, points_required
        "#,
    )
    .bind(req.level)
    .bind(&req.name)
    .bind(req.points_required)
    .fetch_one(&state.pool)
    .await?;

    info!(level = level.level, name = %level.name, "Level threshold upserted");
    Ok(Json(ApiResponse::success(level)))
}

/// 删除等级阈值
///
/// DELETE /api/admin/levels/{level}
pub async fn delete_level(
    State(state): State<AppState>,
    Path(level): Path<i32>,
) -> Result<Json<ApiResponse<()>>> {
    let result = sqlx::query("DELETE FROM levels WHERE level = $1")
        .bind(level)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::LevelNotFound(level));
    }

    info!(level = level, "Level threshold deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}
