//! 行动记录 API 处理器
//!
//! 员工提交行动记录并查看自己的历史。免审行动在提交事务提交后
//! 立即走入账流水线（与人工审核同一条路径）。

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use greenloop_core::{ActionCategory, LogStatus};
use sqlx::FromRow;
use tracing::{info, warn};
use validator::Validate;

use super::action::db_enum_str;
use super::approval::credit_approved_log;
use crate::{
    auth::Claims,
    dto::{
        ActionLogDto, ActionLogFilter, ApiResponse, CreateActionLogRequest, PageResponse,
        PaginationParams,
    },
    error::{ApiError, Result},
    state::AppState,
};

/// 行动记录行（带行动名称和分类）
#[derive(Debug, FromRow)]
struct ActionLogRow {
    id: i64,
    action_id: i64,
    action_name: String,
    category: ActionCategory,
    note: Option<String>,
    logged_on: NaiveDate,
    status: LogStatus,
    points_awarded: Option<i32>,
    co2_awarded_grams: Option<i32>,
    review_note: Option<String>,
    reviewed_at: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
}

impl From<ActionLogRow> for ActionLogDto {
    fn from(row: ActionLogRow) -> Self {
        Self {
            id: row.id,
            action_id: row.action_id,
            action_name: row.action_name,
            category: row.category,
            note: row.note,
            logged_on: row.logged_on,
            status: row.status,
            points_awarded: row.points_awarded,
            co2_awarded_grams: row.co2_awarded_grams,
            review_note: row.review_note,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        }
    }
}

/// 提交行动记录
///
/// POST /api/action-logs
///
/// 同一行动同一天只能提交一条。免审行动在记录落库后立即入账，
/// 需审核的行动进入待审核队列。
pub async fn create_action_log(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateActionLogRequest>,
) -> Result<Json<ApiResponse<ActionLogDto>>> {
    req.validate()?;

    let employee_id = claims.user_id()?;
    let logged_on = req.logged_on.unwrap_or_else(|| Utc::now().date_naive());

    // 行动必须存在且已上线
    let action: Option<(bool, bool)> = sqlx::query_as(
        "SELECT status = 'active', requires_approval FROM eco_actions WHERE id = $1",
    )
    .bind(req.action_id)
    .fetch_optional(&state.pool)
    .await?;
    let (is_active, requires_approval) =
        action.ok_or(ApiError::ActionNotFound(req.action_id))?;
    if !is_active {
        return Err(ApiError::ActionNotActive);
    }

    // 同一行动同一天去重，唯一索引兜底并发提交，命中冲突即视为重复
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO action_logs (employee_id, action_id, note, logged_on, status, created_at)
        VALUES ($1, $2, $3, $4, 'pending', NOW())
        ON CONFLICT (employee_id, action_id, logged_on) WHERE status <> 'rejected'
        DO NOTHING
        RETURNING id
        "#,
    )
    .bind(employee_id)
    .bind(req.action_id)
    .bind(&req.note)
    .bind(logged_on)
    .fetch_optional(&state.pool)
    .await?;
    let Some((log_id,)) = inserted else {
        return Err(ApiError::DuplicateLog);
    };

    metrics::counter!("action_logs_submitted_total").increment(1);
    info!(
        log_id = log_id,
        employee_id = employee_id,
        action_id = req.action_id,
        "Action log submitted"
    );

    // 免审行动立即入账，与人工审核共用同一条流水线
    if !requires_approval {
        if let Err(e) = credit_approved_log(&state.pool, log_id, None, None).await {
            // 入账失败时记录保持 pending，可由管理员人工审核兜底
            warn!(log_id = log_id, error = %e, "Auto-approve failed, log left pending");
        }
    }

    let row = fetch_log(&state.pool, employee_id, log_id).await?;
    Ok(Json(ApiResponse::success(row.into())))
}

/// 查询自己的行动记录（分页）
///
/// GET /api/action-logs
pub async fn list_my_action_logs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ActionLogFilter>,
) -> Result<Json<ApiResponse<PageResponse<ActionLogDto>>>> {
    let employee_id = claims.user_id()?;
    let status = filter.status.map(db_enum_str);

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM action_logs
        WHERE employee_id = $1
          AND ($2::text IS NULL OR status = $2)
          AND ($3::bigint IS NULL OR action_id = $3)
          AND ($4::date IS NULL OR logged_on >= $4)
          AND ($5::date IS NULL OR logged_on <= $5)
        "#,
    )
    .bind(employee_id)
    .bind(&status)
    .bind(filter.action_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_one(&state.pool)
    .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let rows = sqlx::query_as::<_, ActionLogRow>(
        r#"
        SELECT l.id, l.action_id, a.name AS action_name, a.category,
               l.note, l.logged_on, l.status, l.points_awarded, l.co2_awarded_grams,
               l.review_note, l.reviewed_at, l.created_at
        FROM action_logs l
        JOIN eco_actions a ON a.id = l.action_id
        WHERE l.employee_id = $1
          AND ($2::text IS NULL OR l.status = $2)
          AND ($3::bigint IS NULL OR l.action_id = $3)
          AND ($4::date IS NULL OR l.logged_on >= $4)
          AND ($5::date IS NULL OR l.logged_on <= $5)
        ORDER BY l.logged_on DESC, l.id DESC
        LIMIT $6 OFFSET $7
        "#,
    )
    .bind(employee_id)
    .bind(&status)
    .bind(filter.action_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<ActionLogDto> = rows.into_iter().map(Into::into).collect();
    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

async fn fetch_log(pool: &sqlx::PgPool, employee_id: i64, log_id: i64) -> Result<ActionLogRow> {
    sqlx::query_as(
        r#"
        SELECT l.id, l.action_id, a.name AS action_name, a.category,
               l.note, l.logged_on, l.status, l.points_awarded, l.co2_awarded_grams,
               l.review_note, l.reviewed_at, l.created_at
        FROM action_logs l
        JOIN eco_actions a ON a.id = l.action_id
        WHERE l.id = $1 AND l.employee_id = $2
        "#,
    )
    .bind(log_id)
    .bind(employee_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::LogNotFound(log_id))
}

#[cfg(test)]
mod tests {
    use greenloop_shared::{config::DatabaseConfig, database::Database};

    const INSERT_LOG: &str = r#"
        INSERT INTO action_logs (employee_id, action_id, note, logged_on, status, created_at)
        VALUES ($1, $2, NULL, $3, 'pending', NOW())
        ON CONFLICT (employee_id, action_id, logged_on) WHERE status <> 'rejected'
        DO NOTHING
        RETURNING id
    "#;

    #[tokio::test]
    #[ignore] // 需要数据库连接
    async fn test_duplicate_daily_log_rejected_by_unique_index() {
        let db = Database::connect(&DatabaseConfig::default()).await.unwrap();
        let mut tx = db.pool().begin().await.unwrap();

        let (employee_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO employees (email, username, password_hash, display_name)
            VALUES ('dup-log@example.com', 'dup-log', 'x', '去重测试')
            RETURNING id
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .unwrap();

        let (action_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO eco_actions (category, name, points, co2_saved_grams, status)
            VALUES ('transport', '去重测试行动', 10, 100, 'active')
            RETURNING id
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .unwrap();

        let logged_on = chrono::Utc::now().date_naive();

        // 第一次提交成功，第二次命中唯一索引返回空行
        let first: Option<(i64,)> = sqlx::query_as(INSERT_LOG)
            .bind(employee_id)
            .bind(action_id)
            .bind(logged_on)
            .fetch_optional(&mut *tx)
            .await
            .unwrap();
        assert!(first.is_some());

        let second: Option<(i64,)> = sqlx::query_as(INSERT_LOG)
            .bind(employee_id)
            .bind(action_id)
            .bind(logged_on)
            .fetch_optional(&mut *tx)
            .await
            .unwrap();
        assert!(second.is_none());

        tx.rollback().await.unwrap();
    }
}
