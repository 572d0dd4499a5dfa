//! 审核管理 API 处理器
//!
//! 待审核记录列表、通过和驳回。通过时在一个事务内完成积分入账、
//! 团队与挑战进度更新以及徽章评估（见 [`credit_approved_log`]）。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use greenloop_core::{Badge, BadgeEvaluator, MetricSnapshot};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use validator::Validate;

use crate::{
    auth::Claims,
    dto::{ApiResponse, PageResponse, PaginationParams, PendingLogDto, ReviewRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 待审核记录行（带员工和行动信息）
#[derive(sqlx::FromRow)]
struct PendingLogRow {
    id: i64,
    employee_id: i64,
    employee_name: String,
    action_id: i64,
    action_name: String,
    category: greenloop_core::ActionCategory,
    points: i32,
    co2_saved_grams: i32,
    note: Option<String>,
    logged_on: NaiveDate,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PendingLogRow> for PendingLogDto {
    fn from(row: PendingLogRow) -> Self {
        Self {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            action_id: row.action_id,
            action_name: row.action_name,
            category: row.category,
            points: row.points,
            co2_saved_grams: row.co2_saved_grams,
            note: row.note,
            logged_on: row.logged_on,
            created_at: row.created_at,
        }
    }
}

/// 获取待审核记录列表（分页）
///
/// GET /api/admin/approvals
pub async fn list_pending(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<PendingLogDto>>>> {
    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM action_logs WHERE status = 'pending'")
            .fetch_one(&state.pool)
            .await?;

    if total.0 == 0 {
        return Ok(Json(ApiResponse::success(PageResponse::empty(
            pagination.page,
            pagination.page_size,
        ))));
    }

    let rows = sqlx::query_as::<_, PendingLogRow>(
        r#"
        SELECT
            l.id,
            l.employee_id,
            e.display_name AS employee_name,
            l.action_id,
            a.name AS action_name,
            a.category,
            a.points,
            a.co2_saved_grams,
            l.note,
            l.logged_on,
            l.created_at
        FROM action_logs l
        JOIN employees e ON e.id = l.employee_id
        JOIN eco_actions a ON a.id = l.action_id
        WHERE l.status = 'pending'
        ORDER BY l.created_at ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<PendingLogDto> = rows.into_iter().map(Into::into).collect();
    let response = PageResponse::new(items, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 审核通过
///
/// POST /api/admin/approvals/{id}/approve
///
/// 入账、团队/挑战进度和徽章评估在同一事务内完成
pub async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    let reviewer_id = claims.user_id()?;
    credit_approved_log(&state.pool, id, Some(reviewer_id), req.review_note).await?;

    metrics::counter!("action_logs_approved_total").increment(1);
    info!(log_id = id, reviewer_id = reviewer_id, "Action log approved");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 审核驳回
///
/// POST /api/admin/approvals/{id}/reject
///
/// 仅记录审核人和意见，不做任何入账
pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    let reviewer_id = claims.user_id()?;

    let result = sqlx::query(
        r#"
        UPDATE action_logs
        SET status = 'rejected', reviewer_id = $2, review_note = $3, reviewed_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(reviewer_id)
    .bind(&req.review_note)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        // 区分「不存在」和「已审核」
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM action_logs WHERE id = $1)")
                .bind(id)
                .fetch_one(&state.pool)
                .await?;
        return Err(if exists.0 {
            ApiError::LogNotPending
        } else {
            ApiError::LogNotFound(id)
        });
    }

    metrics::counter!("action_logs_rejected_total").increment(1);
    info!(log_id = id, reviewer_id = reviewer_id, "Action log rejected");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 待入账的记录行（锁定后读取）
#[derive(sqlx::FromRow)]
struct LogForCredit {
    employee_id: i64,
    logged_on: NaiveDate,
    status: String,
    points: i32,
    co2_saved_grams: i32,
}

/// 审核通过入账流水线
///
/// 在一个事务内完成：
/// 1. 记录状态置为 approved，快照行动当前的积分/减排值
/// 2. 员工累计积分与碳减排入账
/// 3. 活跃挑战（个人/团队/全公司）进度累加，达标时盖完成时间戳
/// 4. 徽章评估，授予新达成的徽章
///
/// `reviewer_id` 为空表示免审行动的自动入账。
/// 非 pending 状态的记录返回冲突错误。
pub(crate) async fn credit_approved_log(
    pool: &PgPool,
    log_id: i64,
    reviewer_id: Option<i64>,
    review_note: Option<String>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    // 锁定记录行，快照行动定义当前的积分/减排值
    let log: LogForCredit = sqlx::query_as(
        r#"
        SELECT l.employee_id, l.logged_on, l.status, a.points, a.co2_saved_grams
        FROM action_logs l
        JOIN eco_actions a ON a.id = l.action_id
        WHERE l.id = $1
        FOR UPDATE OF l
        "#,
    )
    .bind(log_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::LogNotFound(log_id))?;

    if log.status != "pending" {
        return Err(ApiError::LogNotPending);
    }

    sqlx::query(
        r#"
        UPDATE action_logs
        SET status = 'approved',
            points_awarded = $2,
            co2_awarded_grams = $3,
            reviewer_id = $4,
            review_note = $5,
            reviewed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(log_id)
    .bind(log.points)
    .bind(log.co2_saved_grams)
    .bind(reviewer_id)
    .bind(&review_note)
    .execute(&mut *tx)
    .await?;

    // 员工累计入账，同时取出徽章评估所需的最新值
    let (team_id, total_points, total_co2): (Option<i64>, i64, i64) = sqlx::query_as(
        r#"
        UPDATE employees
        SET total_points = total_points + $2,
            total_co2_saved_grams = total_co2_saved_grams + $3,
            updated_at = NOW()
        WHERE id = $1
        RETURNING team_id, total_points, total_co2_saved_grams
        "#,
    )
    .bind(log.employee_id)
    .bind(log.points as i64)
    .bind(log.co2_saved_grams as i64)
    .fetch_one(&mut *tx)
    .await?;

    bump_challenge_progress(
        &mut tx,
        log.employee_id,
        team_id,
        log.logged_on,
        log.points as i64,
        log.co2_saved_grams as i64,
    )
    .await?;

    evaluate_badges(&mut tx, log.employee_id, total_points, total_co2).await?;

    tx.commit().await?;
    Ok(())
}

/// 累加活跃挑战的参与者进度
///
/// 进度增量按挑战指标取值：points → 行动积分、actions_count → 1、
/// co2_saved → 减排克数。只累计窗口覆盖 logged_on 的挑战。
async fn bump_challenge_progress(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: i64,
    team_id: Option<i64>,
    logged_on: NaiveDate,
    points: i64,
    co2_grams: i64,
) -> Result<()> {
    // 个人挑战：本人已加入的参与行
    sqlx::query(
        r#"
        UPDATE challenge_participants cp
        SET progress = cp.progress + delta.amount
        FROM challenges c,
             LATERAL (
                 SELECT CASE c.metric
                     WHEN 'points' THEN $3::bigint
                     WHEN 'actions_count' THEN 1::bigint
                     ELSE $4::bigint
                 END AS amount
             ) delta
        WHERE cp.challenge_id = c.id
          AND c.status = 'active'
          AND c.scope = 'individual'
          AND cp.employee_id = $1
          AND c.starts_at::date <= $2
          AND $2 < c.ends_at::date
        "#,
    )
    .bind(employee_id)
    .bind(logged_on)
    .bind(points)
    .bind(co2_grams)
    .execute(&mut **tx)
    .await?;

    // 团队挑战：员工所属团队的参与行
    if let Some(team_id) = team_id {
        sqlx::query(
            r#"
            UPDATE challenge_participants cp
            SET progress = cp.progress + delta.amount
            FROM challenges c,
                 LATERAL (
                     SELECT CASE c.metric
                         WHEN 'points' THEN $3::bigint
                         WHEN 'actions_count' THEN 1::bigint
                         ELSE $4::bigint
                     END AS amount
                 ) delta
            WHERE cp.challenge_id = c.id
              AND c.status = 'active'
              AND c.scope = 'team'
              AND cp.team_id = $1
              AND c.starts_at::date <= $2
              AND $2 < c.ends_at::date
            "#,
        )
        .bind(team_id)
        .bind(logged_on)
        .bind(points)
        .bind(co2_grams)
        .execute(&mut **tx)
        .await?;
    }

    // 全公司挑战：单一聚合参与行（发布时创建，employee_id/team_id 均为空）
    sqlx::query(
        r#"
        UPDATE challenge_participants cp
        SET progress = cp.progress + delta.amount
        FROM challenges c,
             LATERAL (
                 SELECT CASE c.metric
                     WHEN 'points' THEN $2::bigint
                     WHEN 'actions_count' THEN 1::bigint
                     ELSE $3::bigint
                 END AS amount
             ) delta
        WHERE cp.challenge_id = c.id
          AND c.status = 'active'
          AND c.scope = 'company'
          AND cp.employee_id IS NULL
          AND cp.team_id IS NULL
          AND c.starts_at::date <= $1
          AND $1 < c.ends_at::date
        "#,
    )
    .bind(logged_on)
    .bind(points)
    .bind(co2_grams)
    .execute(&mut **tx)
    .await?;

    // 达标的参与行盖完成时间戳（只盖一次）
    sqlx::query(
        r#"
        UPDATE challenge_participants cp
        SET completed_at = NOW()
        FROM challenges c
        WHERE cp.challenge_id = c.id
          AND c.status = 'active'
          AND cp.completed_at IS NULL
          AND cp.progress >= c.target_value
        "#,
    )
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// 评估并授予新达成的徽章
///
/// 指标快照只统计已通过的行动记录
async fn evaluate_badges(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: i64,
    total_points: i64,
    total_co2: i64,
) -> Result<()> {
    let (actions_count, challenges_completed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM action_logs WHERE employee_id = $1 AND status = 'approved'),
            (SELECT COUNT(*) FROM challenge_participants
             WHERE employee_id = $1 AND completed_at IS NOT NULL)
        "#,
    )
    .bind(employee_id)
    .fetch_one(&mut **tx)
    .await?;

    // 连续打卡天数：取最近的已通过打卡日期序列，在内存中数连续段
    let dates: Vec<(NaiveDate,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT logged_on
        FROM action_logs
        WHERE employee_id = $1 AND status = 'approved'
        ORDER BY logged_on DESC
        LIMIT 366
        "#,
    )
    .bind(employee_id)
    .fetch_all(&mut **tx)
    .await?;
    let streak_days = current_streak(
        &dates.iter().map(|d| d.0).collect::<Vec<_>>(),
        Utc::now().date_naive(),
    );

    let snapshot = MetricSnapshot {
        total_points,
        actions_count,
        co2_saved_grams: total_co2,
        challenges_completed,
        streak_days,
    };

    // 候选集：已上线且尚未获得的徽章
    let candidates: Vec<Badge> = sqlx::query_as(
        r#"
        SELECT id, name, description, icon_url, metric, threshold, status, created_at, updated_at
        FROM badges
        WHERE status = 'active'
          AND id NOT IN (SELECT badge_id FROM employee_badges WHERE employee_id = $1)
        "#,
    )
    .bind(employee_id)
    .fetch_all(&mut **tx)
    .await?;

    let earned = BadgeEvaluator::evaluate(&snapshot, &candidates);
    for badge_id in &earned {
        sqlx::query(
            r#"
            INSERT INTO employee_badges (employee_id, badge_id, earned_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (employee_id, badge_id) DO NOTHING
            "#,
        )
        .bind(employee_id)
        .bind(badge_id)
        .execute(&mut **tx)
        .await?;

        metrics::counter!("badges_awarded_total").increment(1);
        info!(employee_id = employee_id, badge_id = badge_id, "Badge awarded");
    }

    Ok(())
}

/// 连续打卡天数
///
/// 输入为降序排列的去重日期。连续段必须延续到今天或昨天，
/// 否则视为已中断，返回 0；空输入返回 0。
fn current_streak(dates_desc: &[NaiveDate], today: NaiveDate) -> i64 {
    let Some(&latest) = dates_desc.first() else {
        return 0;
    };

    let yesterday = today.pred_opt().unwrap_or(today);
    if latest < yesterday {
        return 0;
    }

    let mut streak = 1i64;
    let mut expected = latest;
    for &d in &dates_desc[1..] {
        expected = expected.pred_opt().unwrap_or(expected);
        if d == expected {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_streak_empty() {
        assert_eq!(current_streak(&[], d(2025, 6, 10)), 0);
    }

    #[test]
    fn test_streak_single_day() {
        assert_eq!(current_streak(&[d(2025, 6, 10)], d(2025, 6, 10)), 1);
    }

    #[test]
    fn test_streak_consecutive_days() {
        let dates = vec![d(2025, 6, 10), d(2025, 6, 9), d(2025, 6, 8)];
        assert_eq!(current_streak(&dates, d(2025, 6, 10)), 3);
    }

    #[test]
    fn test_streak_broken_by_gap() {
        // 6/7 缺勤，连续段止于 6/8
        let dates = vec![d(2025, 6, 10), d(2025, 6, 9), d(2025, 6, 8), d(2025, 6, 6)];
        assert_eq!(current_streak(&dates, d(2025, 6, 10)), 3);
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        let dates = vec![d(2025, 7, 1), d(2025, 6, 30), d(2025, 6, 29)];
        assert_eq!(current_streak(&dates, d(2025, 7, 1)), 3);
    }

    #[test]
    fn test_streak_allows_latest_yesterday() {
        // 昨天打卡、今天还没打，连续段未中断
        let dates = vec![d(2025, 6, 9), d(2025, 6, 8)];
        assert_eq!(current_streak(&dates, d(2025, 6, 10)), 2);
    }

    #[test]
    fn test_stale_run_does_not_count() {
        // 几个月前的连续段不能因为补审旧记录而复活
        let dates = vec![d(2025, 3, 10), d(2025, 3, 9), d(2025, 3, 8)];
        assert_eq!(current_streak(&dates, d(2025, 6, 10)), 0);

        // 前天打卡也已中断
        let dates = vec![d(2025, 6, 8), d(2025, 6, 7)];
        assert_eq!(current_streak(&dates, d(2025, 6, 10)), 0);
    }
}
