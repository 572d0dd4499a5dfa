//! 运营统计 API 处理器（管理端）
//!
//! 概览、月度趋势、类别分布和排行榜。统计均为实时查询，
//! 数据量级（千人以内）下无需预聚合。

use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::FromRow;

use crate::{
    dto::{
        ApiResponse, CategoryDistributionDto, EmployeeRankingDto, LeaderboardParams,
        MonthlyTrendPoint, StatsOverview, TeamRankingDto,
    },
    error::Result,
    state::AppState,
};

/// 获取统计概览
///
/// GET /api/admin/analytics/overview
pub async fn get_overview(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatsOverview>>> {
    #[derive(FromRow)]
    struct OverviewRow {
        total_employees: i64,
        active_employees: i64,
        total_actions_logged: i64,
        total_actions_approved: i64,
        pending_approvals: i64,
        total_points_awarded: i64,
        total_co2_saved_grams: i64,
        active_challenges: i64,
    }

    let row: OverviewRow = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees) AS total_employees,
            (SELECT COUNT(*) FROM employees WHERE status = 'active') AS active_employees,
            (SELECT COUNT(*) FROM action_logs) AS total_actions_logged,
            (SELECT COUNT(*) FILTER (WHERE status = 'approved') FROM action_logs)
                AS total_actions_approved,
            (SELECT COUNT(*) FILTER (WHERE status = 'pending') FROM action_logs)
                AS pending_approvals,
            (SELECT COALESCE(SUM(points_awarded), 0)::bigint FROM action_logs
             WHERE status = 'approved') AS total_points_awarded,
            (SELECT COALESCE(SUM(co2_awarded_grams), 0)::bigint FROM action_logs
             WHERE status = 'approved') AS total_co2_saved_grams,
            (SELECT COUNT(*) FROM challenges WHERE status = 'active') AS active_challenges
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(StatsOverview {
        total_employees: row.total_employees,
        active_employees: row.active_employees,
        total_actions_logged: row.total_actions_logged,
        total_actions_approved: row.total_actions_approved,
        pending_approvals: row.pending_approvals,
        total_points_awarded: row.total_points_awarded,
        total_co2_saved_grams: row.total_co2_saved_grams,
        active_challenges: row.active_challenges,
    })))
}

/// 获取月度趋势（最近 12 个月的审核通过记录）
///
/// GET /api/admin/analytics/trends
pub async fn get_monthly_trends(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MonthlyTrendPoint>>>> {
    #[derive(FromRow)]
    struct TrendRow {
        month: String,
        actions_count: i64,
        points_awarded: i64,
        co2_saved_grams: i64,
    }

    let rows: Vec<TrendRow> = sqlx::query_as(
        r#"
        SELECT to_char(date_trunc('month', logged_on), 'YYYY-MM') AS month,
               COUNT(*) AS actions_count,
               COALESCE(SUM(points_awarded), 0)::bigint AS points_awarded,
               COALESCE(SUM(co2_awarded_grams), 0)::bigint AS co2_saved_grams
        FROM action_logs
        WHERE status = 'approved'
          AND logged_on >= date_trunc('month', CURRENT_DATE) - INTERVAL '11 months'
        GROUP BY date_trunc('month', logged_on)
        ORDER BY date_trunc('month', logged_on)
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let points: Vec<MonthlyTrendPoint> = rows
        .into_iter()
        .map(|row| MonthlyTrendPoint {
            month: row.month,
            actions_count: row.actions_count,
            points_awarded: row.points_awarded,
            co2_saved_grams: row.co2_saved_grams,
        })
        .collect();

    Ok(Json(ApiResponse::success(points)))
}

/// 获取行动类别分布（审核通过记录的占比）
///
/// GET /api/admin/analytics/categories
pub async fn get_category_distribution(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryDistributionDto>>>> {
    #[derive(FromRow)]
    struct CategoryRow {
        category: String,
        count: i64,
    }

    let rows: Vec<CategoryRow> = sqlx::query_as(
        r#"
        SELECT a.category, COUNT(*) AS count
        FROM action_logs l
        JOIN eco_actions a ON a.id = l.action_id
        WHERE l.status = 'approved'
        GROUP BY a.category
        ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let total: i64 = rows.iter().map(|r| r.count).sum();
    let items: Vec<CategoryDistributionDto> = rows
        .into_iter()
        .map(|row| {
            let percentage = if total > 0 {
                (row.count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            CategoryDistributionDto {
                category: row.category,
                count: row.count,
                percentage,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

/// 获取员工排行榜（按累计积分）
///
/// GET /api/admin/analytics/leaderboard/employees
pub async fn get_employee_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<ApiResponse<Vec<EmployeeRankingDto>>>> {
    #[derive(FromRow)]
    struct RankRow {
        rank: i64,
        employee_id: i64,
        display_name: String,
        department: Option<String>,
        total_points: i64,
        total_co2_saved_grams: i64,
    }

    let rows: Vec<RankRow> = sqlx::query_as(
        r#"
        SELECT RANK() OVER (ORDER BY total_points DESC) AS rank,
               id AS employee_id, display_name, department,
               total_points, total_co2_saved_grams
        FROM employees
        WHERE status = 'active'
        ORDER BY total_points DESC, id
        LIMIT $1
        "#,
    )
    .bind(params.limit())
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<EmployeeRankingDto> = rows
        .into_iter()
        .map(|row| EmployeeRankingDto {
            rank: row.rank,
            employee_id: row.employee_id,
            display_name: row.display_name,
            department: row.department,
            total_points: row.total_points,
            total_co2_saved_grams: row.total_co2_saved_grams,
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

/// 获取团队排行榜（成员累计值实时聚合）
///
/// GET /api/admin/analytics/leaderboard/teams
pub async fn get_team_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<ApiResponse<Vec<TeamRankingDto>>>> {
    #[derive(FromRow)]
    struct TeamRankRow {
        rank: i64,
        team_id: i64,
        team_name: String,
        member_count: i64,
        total_points: i64,
        total_co2_saved_grams: i64,
    }

    let rows: Vec<TeamRankRow> = sqlx::query_as(
        r#"
        WITH team_totals AS (
            SELECT t.id AS team_id, t.name AS team_name,
                   COUNT(e.id) AS member_count,
                   COALESCE(SUM(e.total_points), 0)::bigint AS total_points,
                   COALESCE(SUM(e.total_co2_saved_grams), 0)::bigint AS total_co2_saved_grams
            FROM teams t
            LEFT JOIN employees e ON e.team_id = t.id AND e.status = 'active'
            GROUP BY t.id
        )
        SELECT RANK() OVER (ORDER BY total_points DESC) AS rank,
               team_id, team_name, member_count, total_points, total_co2_saved_grams
        FROM team_totals
        ORDER BY total_points DESC, team_id
        LIMIT $1
        "#,
    )
    .bind(params.limit())
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<TeamRankingDto> = rows
        .into_iter()
        .map(|row| TeamRankingDto {
            rank: row.rank,
            team_id: row.team_id,
            team_name: row.team_name,
            member_count: row.member_count,
            total_points: row.total_points,
            total_co2_saved_grams: row.total_co2_saved_grams,
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}
