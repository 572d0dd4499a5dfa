//! 团队 API 处理器
//!
//! 员工端的团队列表、详情和加入，管理端的团队 CRUD。
//! 团队积分不落库，展示时由当前成员的累计值实时聚合，
//! 因此成员换队后贡献自动跟随新团队。

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use crate::{
    auth::Claims,
    dto::{
        ApiResponse, CreateTeamRequest, TeamDetailDto, TeamDto, TeamMemberDto, UpdateTeamRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

/// 团队聚合行
#[derive(Debug, FromRow)]
struct TeamRow {
    id: i64,
    name: String,
    description: Option<String>,
    member_count: i64,
    total_points: i64,
    total_co2_saved_grams: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TeamRow> for TeamDto {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            member_count: row.member_count,
            total_points: row.total_points,
            total_co2_saved_grams: row.total_co2_saved_grams,
            created_at: row.created_at,
        }
    }
}

const TEAM_AGG_SQL: &str = r#"
    SELECT t.id, t.name, t.description, t.created_at,
           COUNT(e.id) AS member_count,
           COALESCE(SUM(e.total_points), 0)::bigint AS total_points,
           COALESCE(SUM(e.total_co2_saved_grams), 0)::bigint AS total_co2_saved_grams
    FROM teams t
    LEFT JOIN employees e ON e.team_id = t.id AND e.status = 'active'
"#;

async fn fetch_team_by_id(pool: &sqlx::PgPool, id: i64) -> Result<TeamDto> {
    let sql = format!("{} WHERE t.id = $1 GROUP BY t.id", TEAM_AGG_SQL);
    let row = sqlx::query_as::<_, TeamRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::TeamNotFound(id))?;
    Ok(row.into())
}

// ============================================
// 员工端
// ============================================

/// 获取团队列表（带成员数和累计值）
///
/// GET /api/teams
pub async fn list_teams(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TeamDto>>>> {
    let sql = format!("{} GROUP BY t.id ORDER BY total_points DESC, t.id", TEAM_AGG_SQL);
    let rows = sqlx::query_as::<_, TeamRow>(&sql)
        .fetch_all(&state.pool)
        .await?;

    let teams: Vec<TeamDto> = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(teams)))
}

/// 获取团队详情（带成员列表）
///
/// GET /api/teams/{id}
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TeamDetailDto>>> {
    let team = fetch_team_by_id(&state.pool, id).await?;

    let members: Vec<TeamMemberDto> = sqlx::query_as::<_, TeamMemberRow>(
        r#"
        SELECT id, display_name, department, total_points, total_co2_saved_grams
        FROM employees
        WHERE team_id = $1 AND status = 'active'
        ORDER BY total_points DESC, id
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(Into::into)
    .collect();

    Ok(Json(ApiResponse::success(TeamDetailDto { team, members })))
}

#[derive(Debug, FromRow)]
struct TeamMemberRow {
    id: i64,
    display_name: String,
    department: Option<String>,
    total_points: i64,
    total_co2_saved_grams: i64,
}

impl From<TeamMemberRow> for TeamMemberDto {
    fn from(row: TeamMemberRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            department: row.department,
            total_points: row.total_points,
            total_co2_saved_grams: row.total_co2_saved_grams,
        }
    }
}

/// 加入团队
///
/// POST /api/teams/{id}/join
///
/// 员工同一时刻只属于一个团队，已在其他团队时直接换队
pub async fn join_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TeamDto>>> {
    let employee_id = claims.user_id()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if !exists.0 {
        return Err(ApiError::TeamNotFound(id));
    }

    sqlx::query("UPDATE employees SET team_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(id)
        .bind(employee_id)
        .execute(&state.pool)
        .await?;

    info!(employee_id = employee_id, team_id = id, "Employee joined team");

    let team = fetch_team_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(team)))
}

// ============================================
// 管理端
// ============================================

/// 创建团队
///
/// POST /api/admin/teams
pub async fn create_team(
    State(state): State<AppState>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Json<ApiResponse<TeamDto>>> {
    req.validate()?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO teams (name, description, created_at, updated_at)
        VALUES ($1, $2, NOW(), NOW())
        RETURNING id
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&state.pool)
    .await?;

    info!(team_id = id, name = %req.name, "Team created");

    let team = fetch_team_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(team)))
}

/// 更新团队
///
/// PUT /api/admin/teams/{id}
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTeamRequest>,
) -> Result<Json<ApiResponse<TeamDto>>> {
    req.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE teams
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TeamNotFound(id));
    }

    info!(team_id = id, "Team updated");

    let team = fetch_team_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(team)))
}

/// 删除团队
///
/// 成员回到无团队状态，个人累计值不受影响
///
/// DELETE /api/admin/teams/{id}
pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let mut tx = state.pool.begin().await?;

    sqlx::query("UPDATE employees SET team_id = NULL, updated_at = NOW() WHERE team_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::TeamNotFound(id));
    }

    tx.commit().await?;

    info!(team_id = id, "Team deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}
