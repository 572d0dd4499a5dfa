//! 操作日志查询 API 处理器（管理端）

use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::FromRow;

use crate::{
    dto::{ApiResponse, OperationLogDto, OperationLogFilter, PageResponse, PaginationParams},
    error::Result,
    state::AppState,
};

#[derive(Debug, FromRow)]
struct OperationLogRow {
    id: i64,
    operator_id: String,
    operator_name: Option<String>,
    module: String,
    action: String,
    target_type: Option<String>,
    target_id: Option<String>,
    ip_address: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OperationLogRow> for OperationLogDto {
    fn from(row: OperationLogRow) -> Self {
        Self {
            id: row.id,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            module: row.module,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            ip_address: row.ip_address,
            created_at: row.created_at,
        }
    }
}

/// 查询操作日志（分页 + 过滤）
///
/// GET /api/admin/operation-logs
pub async fn list_operation_logs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<OperationLogFilter>,
) -> Result<Json<ApiResponse<PageResponse<OperationLogDto>>>> {
    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM operation_logs
        WHERE ($1::text IS NULL OR operator_id = $1)
          AND ($2::text IS NULL OR module = $2)
          AND ($3::text IS NULL OR action = $3)
          AND ($4::text IS NULL OR target_type = $4)
          AND ($5::text IS NULL OR target_id = $5)
          AND ($6::timestamptz IS NULL OR created_at >= $6)
          AND ($7::timestamptz IS NULL OR created_at <= $7)
        "#,
    )
    .bind(&filter.operator_id)
    .bind(&filter.module)
    .bind(&filter.action)
    .bind(&filter.target_type)
    .bind(&filter.target_id)
    .bind(filter.start_time)
    .bind(filter.end_time)
    .fetch_one(&state.pool)
    .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let rows = sqlx::query_as::<_, OperationLogRow>(
        r#"
        SELECT id, operator_id, operator_name, module, action,
               target_type, target_id, ip_address, created_at
        FROM operation_logs
        WHERE ($1::text IS NULL OR operator_id = $1)
          AND ($2::text IS NULL OR module = $2)
          AND ($3::text IS NULL OR action = $3)
          AND ($4::text IS NULL OR target_type = $4)
          AND ($5::text IS NULL OR target_id = $5)
          AND ($6::timestamptz IS NULL OR created_at >= $6)
          AND ($7::timestamptz IS NULL OR created_at <= $7)
        ORDER BY created_at DESC
        LIMIT $8 OFFSET $9
        "#,
    )
    .bind(&filter.operator_id)
    .bind(&filter.module)
    .bind(&filter.action)
    .bind(&filter.target_type)
    .bind(&filter.target_id)
    .bind(filter.start_time)
    .bind(filter.end_time)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<OperationLogDto> = rows.into_iter().map(Into::into).collect();
    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}
