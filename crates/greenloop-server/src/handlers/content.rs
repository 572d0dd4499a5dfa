//! 内容 API 处理器
//!
//! 员工端的已发布内容列表，管理端的内容 CRUD 与发布/归档

use axum::{
    Json,
    extract::{Path, Query, State},
};
use greenloop_core::ContentItem;
use tracing::info;
use validator::Validate;

use super::action::db_enum_str;
use crate::{
    dto::{
        ApiResponse, ContentFilter, CreateContentRequest, PageResponse, PaginationParams,
        UpdateContentRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

const CONTENT_COLUMNS: &str =
    "id, kind, title, body, status, published_at, created_at, updated_at";

async fn fetch_content_by_id(pool: &sqlx::PgPool, id: i64) -> Result<ContentItem> {
    let sql = format!("SELECT {} FROM content_items WHERE id = $1", CONTENT_COLUMNS);
    sqlx::query_as::<_, ContentItem>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::ContentNotFound(id))
}

// ============================================
// 员工端
// ============================================

/// 获取已发布内容（分页，按发布时间倒序）
///
/// GET /api/content
pub async fn list_published_content(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ContentFilter>,
) -> Result<Json<ApiResponse<PageResponse<ContentItem>>>> {
    let kind = filter.kind.map(db_enum_str);

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM content_items
        WHERE status = 'published'
          AND ($1::text IS NULL OR kind = $1)
        "#,
    )
    .bind(&kind)
    .fetch_one(&state.pool)
    .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let sql = format!(
        r#"
        SELECT {}
        FROM content_items
        WHERE status = 'published'
          AND ($1::text IS NULL OR kind = $1)
        ORDER BY published_at DESC
        LIMIT $2 OFFSET $3
        "#,
        CONTENT_COLUMNS
    );
    let items = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(&kind)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

// ============================================
// 管理端
// ============================================

/// 获取内容列表（分页）
///
/// GET /api/admin/content
pub async fn list_content(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ContentFilter>,
) -> Result<Json<ApiResponse<PageResponse<ContentItem>>>> {
    let kind = filter.kind.map(db_enum_str);
    let status = filter.status.map(db_enum_str);
    let keyword_pattern = filter
        .keyword
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("%{}%", k.trim()));

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM content_items
        WHERE ($1::text IS NULL OR kind = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR title ILIKE $3)
        "#,
    )
    .bind(&kind)
    .bind(&status)
    .bind(&keyword_pattern)
    .fetch_one(&state.pool)
    .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let sql = format!(
        r#"
        SELECT {}
        FROM content_items
        WHERE ($1::text IS NULL OR kind = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR title ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
        CONTENT_COLUMNS
    );
    let items = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(&kind)
        .bind(&status)
        .bind(&keyword_pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取内容详情
///
/// GET /api/admin/content/{id}
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    let item = fetch_content_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// 创建内容（初始为草稿）
///
/// POST /api/admin/content
pub async fn create_content(
    State(state): State<AppState>,
    Json(req): Json<CreateContentRequest>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    req.validate()?;

    let sql = format!(
        r#"
        INSERT INTO content_items (kind, title, body, status, created_at, updated_at)
        VALUES ($1, $2, $3, 'draft', NOW(), NOW())
        RETURNING {}
        "#,
        CONTENT_COLUMNS
    );
    let item = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(db_enum_str(req.kind))
        .bind(&req.title)
        .bind(&req.body)
        .fetch_one(&state.pool)
        .await?;

    info!(content_id = item.id, title = %item.title, "Content created");
    Ok(Json(ApiResponse::success(item)))
}

/// 更新内容
///
/// PUT /api/admin/content/{id}
pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    req.validate()?;

    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM content_items WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if !exists.0 {
        return Err(ApiError::ContentNotFound(id));
    }

    let sql = format!(
        r#"
        UPDATE content_items
        SET kind = COALESCE($2, kind),
            title = COALESCE($3, title),
            body = COALESCE($4, body),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CONTENT_COLUMNS
    );
    let item = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(id)
        .bind(req.kind.map(db_enum_str))
        .bind(&req.title)
        .bind(&req.body)
        .fetch_one(&state.pool)
        .await?;

    info!(content_id = id, "Content updated");
    Ok(Json(ApiResponse::success(item)))
}

/// 发布内容
///
/// POST /api/admin/content/{id}/publish
pub async fn publish_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    let current = fetch_content_by_id(&state.pool, id).await?;
    if current.status == greenloop_core::ContentStatus::Published {
        return Err(ApiError::AlreadyPublished);
    }

    let sql = format!(
        r#"
        UPDATE content_items
        SET status = 'published', published_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CONTENT_COLUMNS
    );
    let item = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(content_id = id, "Content published");
    Ok(Json(ApiResponse::success(item)))
}

/// 归档内容
///
/// POST /api/admin/content/{id}/archive
pub async fn archive_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ContentItem>>> {
    fetch_content_by_id(&state.pool, id).await?;

    let sql = format!(
        r#"
        UPDATE content_items
        SET status = 'archived', updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CONTENT_COLUMNS
    );
    let item = sqlx::query_as::<_, ContentItem>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(content_id = id, "Content archived");
    Ok(Json(ApiResponse::success(item)))
}
