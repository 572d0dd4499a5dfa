//! 员工管理 API 处理器（管理端）
//!
//! 员工列表搜索、详情、启用/禁用

use axum::{
    Json,
    extract::{Path, Query, State},
};
use sqlx::FromRow;
use tracing::info;

use crate::{
    dto::{ApiResponse, EmployeeDto, EmployeeFilter, PageResponse, PaginationParams},
    error::{ApiError, Result},
    state::AppState,
};

/// 员工列表行（带团队名）
#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i64,
    email: String,
    username: String,
    display_name: String,
    department: Option<String>,
    team_id: Option<i64>,
    team_name: Option<String>,
    total_points: i64,
    total_co2_saved_grams: i64,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<EmployeeRow> for EmployeeDto {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            display_name: row.display_name,
            department: row.department,
            team_id: row.team_id,
            team_name: row.team_name,
            total_points: row.total_points,
            total_co2_saved_grams: row.total_co2_saved_grams,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const EMPLOYEE_SELECT_SQL: &str = r#"
    SELECT e.id, e.email, e.username, e.display_name, e.department,
           e.team_id, t.name AS team_name,
           e.total_points, e.total_co2_saved_grams, e.status, e.created_at
    FROM employees e
    LEFT JOIN teams t ON t.id = e.team_id
"#;

/// 获取员工列表（分页 + 搜索）
///
/// GET /api/admin/employees
pub async fn list_employees(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<Json<ApiResponse<PageResponse<EmployeeDto>>>> {
    let keyword_pattern = filter
        .keyword
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("%{}%", k.trim()));
    let status = filter.status.as_ref().map(|s| s.to_lowercase());

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM employees e
        WHERE ($1::text IS NULL
               OR e.display_name ILIKE $1 OR e.username ILIKE $1 OR e.email ILIKE $1)
          AND ($2::text IS NULL OR e.department = $2)
          AND ($3::bigint IS NULL OR e.team_id = $3)
          AND ($4::text IS NULL OR e.status = $4)
        "#,
    )
    .bind(&keyword_pattern)
    .bind(&filter.department)
    .bind(filter.team_id)
    .bind(&status)
    .fetch_one(&state.pool)
    .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let sql = format!(
        r#"{}
        WHERE ($1::text IS NULL
               OR e.display_name ILIKE $1 OR e.username ILIKE $1 OR e.email ILIKE $1)
          AND ($2::text IS NULL OR e.department = $2)
          AND ($3::bigint IS NULL OR e.team_id = $3)
          AND ($4::text IS NULL OR e.status = $4)
        ORDER BY e.created_at DESC
        LIMIT $5 OFFSET $6
        "#,
        EMPLOYEE_SELECT_SQL
    );
    let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(&keyword_pattern)
        .bind(&filter.department)
        .bind(filter.team_id)
        .bind(&status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let items: Vec<EmployeeDto> = rows.into_iter().map(Into::into).collect();
    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取员工详情
///
/// GET /api/admin/employees/{id}
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EmployeeDto>>> {
    let sql = format!("{} WHERE e.id = $1", EMPLOYEE_SELECT_SQL);
    let row = sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::EmployeeNotFound(id))?;

    Ok(Json(ApiResponse::success(row.into())))
}

/// 启用员工账号
///
/// POST /api/admin/employees/{id}/enable
pub async fn enable_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    set_employee_status(&state.pool, id, "active").await?;
    info!(employee_id = id, "Employee enabled");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 禁用员工账号
///
/// 禁用后无法登录，历史数据和累计值保留
///
/// POST /api/admin/employees/{id}/disable
pub async fn disable_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    set_employee_status(&state.pool, id, "disabled").await?;
    info!(employee_id = id, "Employee disabled");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

async fn set_employee_status(pool: &sqlx::PgPool, id: i64, status: &str) -> Result<()> {
    let result = sqlx::query("UPDATE employees SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::EmployeeNotFound(id));
    }
    Ok(())
}
