//! 挑战 API 处理器
//!
//! 员工端的挑战列表（带本人/本队进度）和报名，
//! 管理端的挑战 CRUD 与发布/归档。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use greenloop_core::{
    Challenge, ChallengeMetric, ChallengeScope, ChallengeStatus, challenge_progress_percent,
};
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use super::action::db_enum_str;
use crate::{
    auth::Claims,
    dto::{
        ApiResponse, ChallengeDto, ChallengeFilter, CreateChallengeRequest, PageResponse,
        PaginationParams, UpdateChallengeRequest,
    },
    error::{ApiError, Result},
    state::AppState,
};

const CHALLENGE_COLUMNS: &str =
    "id, name, description, scope, metric, target_value, starts_at, ends_at, \
     status, created_at, updated_at";

/// 挑战窗口合法性检查，创建和修改共用
fn validate_window(starts_at: chrono::DateTime<Utc>, ends_at: chrono::DateTime<Utc>) -> Result<()> {
    if ends_at <= starts_at {
        return Err(ApiError::Validation(
            "结束时间必须晚于开始时间".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_challenge_by_id(pool: &sqlx::PgPool, id: i64) -> Result<Challenge> {
    let sql = format!("SELECT {} FROM challenges WHERE id = $1", CHALLENGE_COLUMNS);
    sqlx::query_as::<_, Challenge>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::ChallengeNotFound(id))
}

/// 员工端挑战行（带参与统计和本人进度）
#[derive(Debug, FromRow)]
struct ChallengeWithProgressRow {
    id: i64,
    name: String,
    description: Option<String>,
    scope: ChallengeScope,
    metric: ChallengeMetric,
    target_value: i64,
    starts_at: chrono::DateTime<Utc>,
    ends_at: chrono::DateTime<Utc>,
    status: ChallengeStatus,
    participant_count: i64,
    my_progress: Option<i64>,
    completed_at: Option<chrono::DateTime<Utc>>,
}

impl From<ChallengeWithProgressRow> for ChallengeDto {
    fn from(row: ChallengeWithProgressRow) -> Self {
        let my_progress_percent = row
            .my_progress
            .map(|p| challenge_progress_percent(p, row.target_value));
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            scope: row.scope,
            metric: row.metric,
            target_value: row.target_value,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            status: row.status,
            participant_count: row.participant_count,
            my_progress: row.my_progress,
            my_progress_percent,
            completed_at: row.completed_at,
        }
    }
}

// ============================================
// 员工端
// ============================================

/// 获取挑战列表（进行中和已结束）
///
/// GET /api/challenges
///
/// 个人挑战取本人参与行，团队挑战取本队参与行，
/// 全公司挑战取聚合参与行作为「我的进度」。
pub async fn list_challenges_for_employee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<ChallengeDto>>>> {
    let employee_id = claims.user_id()?;

    let rows = sqlx::query_as::<_, ChallengeWithProgressRow>(
        r#"
        SELECT c.id, c.name, c.description, c.scope, c.metric, c.target_value,
               c.starts_at, c.ends_at, c.status,
               (SELECT COUNT(*) FROM challenge_participants
                WHERE challenge_id = c.id AND employee_id IS NOT NULL) AS participant_count,
               mine.progress AS my_progress,
               mine.completed_at
        FROM challenges c
        LEFT JOIN LATERAL (
            SELECT cp.progress, cp.completed_at
            FROM challenge_participants cp
            WHERE cp.challenge_id = c.id
              AND ((c.scope = 'individual' AND cp.employee_id = $1)
                OR (c.scope = 'team' AND cp.team_id =
                        (SELECT team_id FROM employees WHERE id = $1))
                OR (c.scope = 'company' AND cp.employee_id IS NULL AND cp.team_id IS NULL))
            LIMIT 1
        ) mine ON TRUE
        WHERE c.status IN ('active', 'completed')
        ORDER BY c.starts_at DESC
        "#,
    )
    .bind(employee_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<ChallengeDto> = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 报名参加挑战
///
/// POST /api/challenges/{id}/join
///
/// 个人挑战创建本人参与行；团队挑战创建本队参与行（队内首位
/// 报名者触发）；全公司挑战无需报名。
pub async fn join_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let employee_id = claims.user_id()?;

    let challenge = fetch_challenge_by_id(&state.pool, id).await?;

    if challenge.status != ChallengeStatus::Active {
        return Err(ApiError::ChallengeNotJoinable("挑战未在进行中".to_string()));
    }
    if challenge.ends_at <= Utc::now() {
        return Err(ApiError::ChallengeNotJoinable("挑战窗口已关闭".to_string()));
    }

    match challenge.scope {
        ChallengeScope::Individual => {
            let result = sqlx::query(
                r#"
                INSERT INTO challenge_participants (challenge_id, employee_id, progress, joined_at)
                VALUES ($1, $2, 0, NOW())
                ON CONFLICT (challenge_id, employee_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(employee_id)
            .execute(&state.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(ApiError::AlreadyJoined);
            }
        }
        ChallengeScope::Team => {
            let (team_id,): (Option<i64>,) =
                sqlx::query_as("SELECT team_id FROM employees WHERE id = $1")
                    .bind(employee_id)
                    .fetch_one(&state.pool)
                    .await?;
            let team_id = team_id.ok_or_else(|| {
                ApiError::ChallengeNotJoinable("需要先加入团队才能参加团队挑战".to_string())
            })?;

            let result = sqlx::query(
                r#"
                INSERT INTO challenge_participants (challenge_id, team_id, progress, joined_at)
                VALUES ($1, $2, 0, NOW())
                ON CONFLICT (challenge_id, team_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(team_id)
            .execute(&state.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(ApiError::AlreadyJoined);
            }
        }
        ChallengeScope::Company => {
            // 全公司挑战所有人自动参与
            return Err(ApiError::ChallengeNotJoinable(
                "全公司挑战无需报名".to_string(),
            ));
        }
    }

    info!(challenge_id = id, employee_id = employee_id, "Joined challenge");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

// ============================================
// 管理端
// ============================================

/// 获取挑战列表（分页）
///
/// GET /api/admin/challenges
pub async fn list_challenges(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ChallengeFilter>,
) -> Result<Json<ApiResponse<PageResponse<Challenge>>>> {
    let scope = filter.scope.map(db_enum_str);
    let status = filter.status.map(db_enum_str);
    let keyword_pattern = filter
        .keyword
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("%{}%", k.trim()));

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM challenges
        WHERE ($1::text IS NULL OR scope = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3)
        "#,
    )
    .bind(&scope)
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
        FROM challenges
        WHERE ($1::text IS NULL OR scope = $1)
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR name ILIKE $3)
        ORDER BY starts_at DESC
        LIMIT $4 OFFSET $5
        "#,
        CHALLENGE_COLUMNS
    );
    let challenges = sqlx::query_as::<_, Challenge>(&sql)
        .bind(&scope)
        .bind(&status)
        .bind(&keyword_pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&state.pool)
        .await?;

    let response = PageResponse::new(challenges, total.0, pagination.page, pagination.page_size);
    Ok(Json(ApiResponse::success(response)))
}

/// 获取挑战详情
///
/// GET /api/admin/challenges/{id}
pub async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Challenge>>> {
    let challenge = fetch_challenge_by_id(&state.pool, id).await?;
    Ok(Json(ApiResponse::success(challenge)))
}

/// 创建挑战（初始为草稿）
///
/// POST /api/admin/challenges
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<Json<ApiResponse<Challenge>>> {
    req.validate()?;
    validate_window(req.starts_at, req.ends_at)?;

    let sql = format!(
        r#"
        INSERT INTO challenges (name, description, scope, metric, target_value,
                                starts_at, ends_at, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', NOW(), NOW())
        RETURNING {}
        "#,
        CHALLENGE_COLUMNS
    );
    let challenge = sqlx::query_as::<_, Challenge>(&sql)
        .bind(&req.name)
        .bind(&req.description)
        .bind(db_enum_str(req.scope))
        .bind(db_enum_str(req.metric))
        .bind(req.target_value)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .fetch_one(&state.pool)
        .await?;

    info!(challenge_id = challenge.id, name = %challenge.name, "Challenge created");
    Ok(Json(ApiResponse::success(challenge)))
}

/// 更新挑战（仅草稿可改）
///
/// PUT /api/admin/challenges/{id}
pub async fn update_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateChallengeRequest>,
) -> Result<Json<ApiResponse<Challenge>>> {
    req.validate()?;

    let current = fetch_challenge_by_id(&state.pool, id).await?;
    if current.status != ChallengeStatus::Draft {
        return Err(ApiError::Validation(
            "只有草稿状态的挑战可以修改".to_string(),
        ));
    }

    // 先在内存中合并出最终窗口再校验，避免把非法窗口写入库
    let merged_starts = req.starts_at.unwrap_or(current.starts_at);
    let merged_ends = req.ends_at.unwrap_or(current.ends_at);
    validate_window(merged_starts, merged_ends)?;

    let sql = format!(
        r#"
        UPDATE challenges
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            target_value = COALESCE($4, target_value),
            starts_at = COALESCE($5, starts_at),
            ends_at = COALESCE($6, ends_at),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CHALLENGE_COLUMNS
    );
    let challenge = sqlx::query_as::<_, Challenge>(&sql)
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.target_value)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .fetch_one(&state.pool)
        .await?;

    info!(challenge_id = id, "Challenge updated");
    Ok(Json(ApiResponse::success(challenge)))
}

/// 发布挑战
///
/// POST /api/admin/challenges/{id}/publish
///
/// 草稿转为进行中；全公司挑战在此时创建聚合参与行
pub async fn publish_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Challenge>>> {
    let current = fetch_challenge_by_id(&state.pool, id).await?;
    if current.status != ChallengeStatus::Draft {
        return Err(ApiError::AlreadyPublished);
    }
    if current.ends_at <= Utc::now() {
        return Err(ApiError::Validation("挑战窗口已过期，无法发布".to_string()));
    }

    let mut tx = state.pool.begin().await?;

    let sql = format!(
        "UPDATE challenges SET status = 'active', updated_at = NOW() WHERE id = $1 RETURNING {}",
        CHALLENGE_COLUMNS
    );
    let challenge = sqlx::query_as::<_, Challenge>(&sql)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    if challenge.scope == ChallengeScope::Company {
        sqlx::query(
            r#"
            INSERT INTO challenge_participants (challenge_id, progress, joined_at)
            VALUES ($1, 0, NOW())
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(challenge_id = id, "Challenge published");
    Ok(Json(ApiResponse::success(challenge)))
}

/// 归档挑战
///
/// POST /api/admin/challenges/{id}/archive
pub async fn archive_challenge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Challenge>>> {
    fetch_challenge_by_id(&state.pool, id).await?;

    let sql = format!(
        "UPDATE challenges SET status = 'archived', updated_at = NOW() WHERE id = $1 RETURNING {}",
        CHALLENGE_COLUMNS
    );
    let challenge = sqlx::query_as::<_, Challenge>(&sql)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    info!(challenge_id = id, "Challenge archived");
    Ok(Json(ApiResponse::success(challenge)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_validate_window_accepts_forward_range() {
        assert!(validate_window(at(1), at(30)).is_ok());
    }

    #[test]
    fn test_validate_window_rejects_inverted_or_empty_range() {
        assert!(matches!(
            validate_window(at(30), at(1)),
            Err(ApiError::Validation(_))
        ));
        // 起止相同的空窗口同样非法
        assert!(validate_window(at(15), at(15)).is_err());
    }

    #[test]
    fn test_partial_update_window_checked_after_merge() {
        // 模拟 COALESCE 语义：只改 ends_at 时必须和库中的 starts_at 合并后再校验
        let current_starts = at(10);
        let current_ends = at(20);

        let req_starts: Option<chrono::DateTime<Utc>> = None;
        let req_ends = Some(at(5));

        let merged_starts = req_starts.unwrap_or(current_starts);
        let merged_ends = req_ends.unwrap_or(current_ends);
        assert!(validate_window(merged_starts, merged_ends).is_err());

        // 不改窗口的更新不受影响
        let untouched: Option<chrono::DateTime<Utc>> = None;
        assert!(
            validate_window(
                untouched.unwrap_or(current_starts),
                untouched.unwrap_or(current_ends)
            )
            .is_ok()
        );
    }
}
