//! 环保行动目录 API 处理器
//!
//! 管理端的目录 CRUD 与上线/下线，员工端的可记录行动列表

use axum::{
    Json,
    extract::{Path, Query, State},
};
use greenloop_core::EcoAction;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ActionFilter, ApiResponse, CreateActionRequest, PageResponse, PaginationParams,
        UpdateActionRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

/// 枚举的数据库存储值（JSON 格式转小写）
pub(crate) fn db_enum_str<T: Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(|s| s.to_lowercase()))
        .unwrap_or_default()
}

const ACTION_COLUMNS: &str =
    "id, category, name, description, points, co2_saved_grams, requires_approval, \
     status, created_at, updated_at";

async fn fetch_action_by_id(pool: &sqlx::PgPool, id: i64) -> Result<EcoAction> {
    let sql = format!("SELECT {} FROM eco_actions WHERE id = $1", ACTION_COLUMNS);
    sqlx::query_as::<_, EcoAction>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::ActionNotFound(id))
}

// ============================================
// 员工端
// ============================================

/// 获取可记录的行动目录（仅已上线）
///
/// GET /api/actions
pub async fn list_active_actions(
    State(state): State<AppState>,
    Query(filter): Query<ActionFilter>,
) -> Result<Json<ApiResponse<Vec<EcoAction>>>> {
    let category = filter.category.map(db_enum_str);

    let sql = format!(
        r#"
        SELECT {}
        FROM eco_actions
        WHERE status = 'active'
          AND ($1::text IS NULL OR category = $1)
        ORDER BY category, points DESC
        "#,
        ACTION_COLUMNS
    );
    let actions = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(category)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(ApiResponse::success(actions)))
}

// ============================================
// 管理端
// ============================================

/// 获取行动目录列表（分页）
///
/// GET /api/admin/actions
pub async fn list_actions(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ActionFilter>,
) -> Result<Json<ApiResponse<PageResponse<EcoAction>>>> {
    let category = filter.category.map(db_enum_str);
    let status = filter.status.map(db_enum_str);
    let keyword_pattern = filter
        .keyword
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("%{}%", k.trim()));

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM eco_actions
        WHERE ($1::text IS NULL OR category = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3)
        "#,
    )
    .bind(&category)
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
        FROM eco_actions
        WHERE ($1::text IS NULL OR category = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
        ACTION_COLUMNS
    );
    let actions = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(&category)
        .bind(&status)
        .bind(&keyword_pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let response = PageResponse::new(actions, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取行动详情
///
/// GET /api/admin/actions/{id}
pub async fn get_action(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EcoAction>>> {
    let action = fetch_action_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(action)))
}

/// 创建行动（初始为草稿）
///
/// POST /api/admin/actions
pub async fn create_action(
    State(state): State<AppState>,
    Json(req): Json<CreateActionRequest>,
) -> Result<Json<ApiResponse<EcoAction>>> {
    req.validate()?;

    let sql = format!(
        r#"
        INSERT INTO eco_actions (category, name, description, points, co2_saved_grams,
                                 requires_approval, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'draft', NOW(), NOW())
        RETURNING {}
        "#,
        ACTION_COLUMNS
    );
    let action = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(db_enum_str(req.category))
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.points)
        .bind(req.co2_saved_grams)
        .bind(req.requires_approval)
        .fetch_one(&state.pool)
        .await?;

    info!(action_id = action.id, name = %action.name, "Eco action created");
    Ok(Json(ApiResponse::success(action)))
}

/// 更新行动
///
/// 积分/减排值的修改只影响之后审核通过的记录
///
/// PUT /api/admin/actions/{id}
pub async fn update_action(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateActionRequest>,
) -> Result<Json<ApiResponse<EcoAction>>> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM eco_actions WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(ApiError::ActionNotFound(id));
    }

    // 使用 COALESCE 实现部分更新，NULL 参数表示不更新该字段
    let sql = format!(
        r#"
        UPDATE eco_actions
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            category = COALESCE($4, category),
            points = COALESCE($5, points),
            co2_saved_grams = COALESCE($6, co2_saved_grams),
            requires_approval = COALESCE($7, requires_approval),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ACTION_COLUMNS
    );
    let action = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.category.map(db_enum_str))
        .bind(req.points)
        .bind(req.co2_saved_grams)
        .bind(req.requires_approval)
        .fetch_one(&state.pool)
        .await?;

    info!(action_id = id, "Eco action updated");
    Ok(Json(ApiResponse::success(action)))
}

/// 上线行动
///
/// POST /api/admin/actions/{id}/publish
pub async fn publish_action(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EcoAction>>> {
    let current = fetch_action_by_id(&state.pool, id).await?;
    if current.status == greenloop_core::ActionStatus::Active {
        return Err(ApiError::AlreadyPublished);
    }

    let sql = format!(
        "UPDATE eco_actions SET status = 'active', updated_at = NOW() WHERE id = $1 RETURNING {}",
        ACTION_COLUMNS
    );
    let action = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(action_id = id, "Eco action published");
    Ok(Json(ApiResponse::success(action)))
}

/// 下线行动
///
/// 已提交的历史记录不受影响
///
/// POST /api/admin/actions/{id}/retire
pub async fn retire_action(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EcoAction>>> {
    // 存在性检查复用详情查询
    fetch_action_by_id(&state.pool, id).await?;

    let sql = format!(
        "UPDATE eco_actions SET status = 'inactive', updated_at = NOW() WHERE id = $1 RETURNING {}",
        ACTION_COLUMNS
    );
    let action = sqlx::query_as::<_, EcoAction>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(action_id = id, "Eco action retired");
    Ok(Json(ApiResponse::success(action)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenloop_core::{ActionCategory, ActionStatus, BadgeMetric, ChallengeMetric};

    #[test]
    fn test_db_enum_str_lowercase() {
        assert_eq!(db_enum_str(ActionCategory::Transport), "transport");
        assert_eq!(db_enum_str(ActionStatus::Inactive), "inactive");
    }

    #[test]
    fn test_db_enum_str_snake_case_metrics() {
        // SCREAMING_SNAKE_CASE 的 JSON 值转小写即为数据库的 snake_case
        assert_eq!(db_enum_str(BadgeMetric::Co2SavedGrams), "co2_saved_grams");
        assert_eq!(db_enum_str(ChallengeMetric::ActionsCount), "actions_count");
    }
}
