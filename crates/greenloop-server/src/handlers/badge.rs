//! 徽章 API 处理器
//!
//! 员工端的徽章墙（带获得标记），管理端的徽章 CRUD 与上线/退役

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use greenloop_core::{Badge, BadgeMetric, BadgeStatus};
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use super::action::db_enum_str;
use crate::{
    auth::Claims,
    dto::{
        ApiResponse, BadgeWithEarnedDto, CreateBadgeRequest, PageResponse, PaginationParams,
        UpdateBadgeRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

const BADGE_COLUMNS: &str =
    "id, name, description, icon_url, metric, threshold, status, created_at, updated_at";

async fn fetch_badge_by_id(pool: &sqlx::PgPool, id: i64) -> Result<Badge> {
    let sql = format!("SELECT {} FROM badges WHERE id = $1", BADGE_COLUMNS);
    sqlx::query_as::<_, Badge>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::BadgeNotFound(id))
}

// ============================================
// 员工端
// ============================================

/// 员工端徽章行
#[derive(Debug, FromRow)]
struct BadgeWithEarnedRow {
    id: i64,
    name: String,
    description: Option<String>,
    icon_url: Option<String>,
    metric: BadgeMetric,
    threshold: i64,
    earned_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 获取徽章墙
///
/// GET /api/badges
///
/// 已上线徽章全部展示，带本人是否已获得；
/// 已退役但本人已获得的徽章仍然展示。
pub async fn list_badges_for_employee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<BadgeWithEarnedDto>>>> {
    let employee_id = claims.user_id()?;

    let rows = sqlx::query_as::<_, BadgeWithEarnedRow>(
        r#"
        SELECT b.id, b.name, b.description, b.icon_url, b.metric, b.threshold,
               eb.earned_at
        FROM badges b
        LEFT JOIN employee_badges eb
               ON eb.badge_id = b.id AND eb.employee_id = $1
        WHERE b.status = 'active' OR eb.id IS NOT NULL
        ORDER BY b.metric, b.threshold
        "#,
    )
    .bind(employee_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<BadgeWithEarnedDto> = rows
        .into_iter()
        .map(|row| BadgeWithEarnedDto {
            id: row.id,
            name: row.name,
            description: row.description,
            icon_url: row.icon_url,
            metric: row.metric,
            threshold: row.threshold,
            earned: row.earned_at.is_some(),
            earned_at: row.earned_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

// ============================================
// 管理端
// ============================================

/// 获取徽章列表（分页）
///
/// GET /api/admin/badges
pub async fn list_badges(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Badge>>>> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM badges")
        .fetch_one(&state.pool)
        .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let sql = format!(
        "SELECT {} FROM badges ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        BADGE_COLUMNS
    );
    let badges = sqlx::query_as::<_, Badge>(&sql)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let response = PageResponse::new(badges, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取徽章详情
///
/// GET /api/admin/badges/{id}
pub async fn get_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Badge>>> {
    let badge = fetch_badge_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(badge)))
}

/// 创建徽章（初始为草稿）
///
/// POST /api/admin/badges
pub async fn create_badge(
    State(state): State<AppState>,
    Json(req): Json<CreateBadgeRequest>,
) -> Result<Json<ApiResponse<Badge>>> {
    req.validate()?;

    let sql = format!(
        r#"
        INSERT INTO badges (name, description, icon_url, metric, threshold,
                            status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'draft', NOW(), NOW())
        RETURNING {}
        "#,
        BADGE_COLUMNS
    );
    let badge = sqlx::query_as::<_, Badge>(&sql)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.icon_url)
        .bind(db_enum_str(req.metric))
        .bind(req.threshold)
        .fetch_one(&state.pool)
        .await?;

    info!(badge_id = badge.id, name = %badge.name, "Badge created");
    Ok(Json(ApiResponse::success(badge)))
}

/// 更新徽章
///
/// 指标和阈值的修改只影响之后的评估，已授予的不回收
///
/// PUT /api/admin/badges/{id}
pub async fn update_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBadgeRequest>,
) -> Result<Json<ApiResponse<Badge>>> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM badges WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(ApiError::BadgeNotFound(id));
    }

    let sql = format!(
        r#"
        UPDATE badges
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            icon_url = COALESCE($4, icon_url),
            metric = COALESCE($5, metric),
            threshold = COALESCE($6, threshold),
            status = COALESCE($7, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        BADGE_COLUMNS
    );
    let badge = sqlx::query_as::<_, Badge>(&sql)
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.icon_url)
        .bind(req.metric.map(db_enum_str))
        .bind(req.threshold)
        .bind(req.status.map(db_enum_str))
        .fetch_one(&state.pool)
        .await?;

    info!(badge_id = id, "Badge updated");
    Ok(Json(ApiResponse::success(badge)))
}

/// 上线徽章
///
/// POST /api/admin/badges/{id}/publish
pub async fn publish_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Badge>>> {
    let current = fetch_badge_by_id(&state.pool, id).await?;
    if current.status == BadgeStatus::Active {
        return Err(ApiError::AlreadyPublished);
    }

    let sql = format!(
        "UPDATE badges SET status = 'active', updated_at = NOW() WHERE id = $1 RETURNING {}",
        BADGE_COLUMNS
    );
    let badge = sqlx::query_as::<_, Badge>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(badge_id = id, "Badge published");
    Ok(Json(ApiResponse::success(badge)))
}

/// 退役徽章
///
/// 停止授予，已获得的仍可展示
///
/// POST /api/admin/badges/{id}/retire
pub async fn retire_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Badge>>> {
    fetch_badge_by_id(&state.pool, id).await?;

    let sql = format!(
        "UPDATE badges SET status = 'retired', updated_at = NOW() WHERE id = $1 RETURNING {}",
        BADGE_COLUMNS
    );
    let badge = sqlx::query_as::<_, Badge>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(badge_id = id, "Badge retired");
    Ok(Json(ApiResponse::success(badge)))
}
