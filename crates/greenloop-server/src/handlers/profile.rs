//! 员工个人主页 API 处理器

use axum::{Extension, Json, extract::State};
use greenloop_core::{LevelThreshold, compute_level_progress};
use sqlx::FromRow;

use crate::{
    auth::Claims,
    dto::{ApiResponse, EmployeeDto, ProfileDto},
    error::{ApiError, Result},
    state::AppState,
};

/// 员工主页聚合行
#[derive(Debug, FromRow)]
struct ProfileRow {
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
    badges_earned: i64,
    actions_approved: i64,
    pending_logs: i64,
}

/// 获取个人主页
///
/// GET /api/profile
///
/// 聚合基础信息、等级进度和徽章/记录统计。等级进度按阈值表实时计算。
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<ProfileDto>>> {
    let employee_id = claims.user_id()?;

    let row: ProfileRow = sqlx::query_as(
        r#"
        SELECT e.id, e.email, e.username, e.display_name, e.department,
               e.team_id, t.name AS team_name,
               e.total_points, e.total_co2_saved_grams, e.status, e.created_at,
               (SELECT COUNT(*) FROM employee_badges WHERE employee_id = e.id) AS badges_earned,
               (SELECT COUNT(*) FROM action_logs
                WHERE employee_id = e.id AND status = 'approved') AS actions_approved,
               (SELECT COUNT(*) FROM action_logs
                WHERE employee_id = e.id AND status = 'pending') AS pending_logs
        FROM employees e
        LEFT JOIN teams t ON t.id = e.team_id
        WHERE e.id = $1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::EmployeeNotFound(employee_id))?;

    let thresholds: Vec<LevelThreshold> = sqlx::query_as(
        "SELECT level, name, points_required FROM levels ORDER BY points_required",
    )
    .fetch_all(&state.pool)
    .await?;

    let level = compute_level_progress(row.total_points, &thresholds);

    let profile = ProfileDto {
        employee: EmployeeDto {
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
        },
        level,
        badges_earned: row.badges_earned,
        actions_approved: row.actions_approved,
        pending_logs: row.pending_logs,
    };

    Ok(Json(ApiResponse::success(profile)))
}
