//! 等级奖励 API 处理器
//!
//! 员工端的奖励列表（带解锁/领取状态）与领取，管理端的奖励 CRUD。
//! 每个员工每个奖励只能领取一次，库存扣减原子执行。

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use greenloop_core::{LevelReward, LevelThreshold, compute_level_progress};
use sqlx::FromRow;
use tracing::info;
use validator::Validate;

use super::action::db_enum_str;
use crate::{
    auth::Claims,
    dto::{ApiResponse, CreateRewardRequest, RewardWithStateDto, UpdateRewardRequest},
    error::{ApiError, Result},
    state::AppState,
};

const REWARD_COLUMNS: &str =
    "id, level, name, description, stock, status, created_at, updated_at";

async fn fetch_reward_by_id(pool: &sqlx::PgPool, id: i64) -> Result<LevelReward> {
    let sql = format!("SELECT {} FROM level_rewards WHERE id = $1", REWARD_COLUMNS);
    sqlx::query_as::<_, LevelReward>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::RewardNotFound(id))
}

/// 计算员工当前等级（阈值表实时计算）
async fn current_level(pool: &sqlx::PgPool, employee_id: i64) -> Result<i32> {
    let (points,): (i64,) = sqlx::query_as("SELECT total_points FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::EmployeeNotFound(employee_id))?;

    let thresholds: Vec<LevelThreshold> = sqlx::query_as(
        "SELECT level, name, points_required FROM levels ORDER BY points_required",
    )
    .fetch_all(pool)
    .await?;

    Ok(compute_level_progress(points, &thresholds).level)
}

// ============================================
// 员工端
// ============================================

/// 员工端奖励行
#[derive(Debug, FromRow)]
struct RewardWithClaimRow {
    id: i64,
    level: i32,
    name: String,
    description: Option<String>,
    stock: Option<i32>,
    claimed: bool,
}

/// 获取奖励列表（带解锁/领取状态）
///
/// GET /api/rewards
pub async fn list_rewards_for_employee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<RewardWithStateDto>>>> {
    let employee_id = claims.user_id()?;
    let my_level = current_level(&state.pool, employee_id).await?;

    let rows = sqlx::query_as::<_, RewardWithClaimRow>(
        r#"
        SELECT r.id, r.level, r.name, r.description, r.stock,
               EXISTS(SELECT 1 FROM reward_claims
                      WHERE reward_id = r.id AND employee_id = $1) AS claimed
        FROM level_rewards r
        WHERE r.status = 'active'
        ORDER BY r.level, r.id
        "#,
    )
    .bind(employee_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<RewardWithStateDto> = rows
        .into_iter()
        .map(|row| RewardWithStateDto {
            id: row.id,
            level: row.level,
            name: row.name,
            description: row.description,
            stock: row.stock,
            unlocked: my_level >= row.level,
            claimed: row.claimed,
        })
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

/// 领取奖励
///
/// POST /api/rewards/{id}/claim
///
/// 等级达标且未领取过才可领取；限量奖励原子扣库存，售罄报错
pub async fn claim_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let employee_id = claims.user_id()?;

    let reward = fetch_reward_by_id(&state.pool, id).await?;
    if reward.status != greenloop_core::RewardStatus::Active {
        return Err(ApiError::RewardInactive);
    }

    let my_level = current_level(&state.pool, employee_id).await?;
    if my_level < reward.level {
        return Err(ApiError::LevelTooLow {
            required: reward.level,
            actual: my_level,
        });
    }

    let mut tx = state.pool.begin().await?;

    // 领取记录的唯一约束挡住重复领取
    let inserted = sqlx::query(
        r#"
        INSERT INTO reward_claims (reward_id, employee_id, status, claimed_at)
        VALUES ($1, $2, 'claimed', NOW())
        ON CONFLICT (reward_id, employee_id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(employee_id)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(ApiError::AlreadyClaimed);
    }

    // 限量奖励原子扣减，stock 为空表示不限量
    let decremented = sqlx::query(
        r#"
        UPDATE level_rewards
        SET stock = stock - 1, updated_at = NOW()
        WHERE id = $1 AND stock IS NOT NULL AND stock > 0
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if reward.stock.is_some() && decremented.rows_affected() == 0 {
        // 回滚领取记录
        return Err(ApiError::RewardOutOfStock);
    }

    tx.commit().await?;

    metrics::counter!("reward_claims_total").increment(1);
    info!(reward_id = id, employee_id = employee_id, "Reward claimed");

    Ok(Json(ApiResponse::<()>::success_empty()))
}

// ============================================
// 管理端
// ============================================

/// 获取奖励列表
///
/// GET /api/admin/rewards
pub async fn list_rewards(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LevelReward>>>> {
    let sql = format!(
        "SELECT {} FROM level_rewards ORDER BY level, id",
        REWARD_COLUMNS
    );
    let rewards = sqlx::query_as::<_, LevelReward>(&sql)
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(ApiResponse::success(rewards)))
}

/// 创建奖励
///
/// POST /api/admin/rewards
pub async fn create_reward(
    State(state): State<AppState>,
    Json(req): Json<CreateRewardRequest>,
) -> Result<Json<ApiResponse<LevelReward>>> {
    req.validate()?;

    let sql = format!(
        r#"
        INSERT INTO level_rewards (level, name, description, stock, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'active', NOW(), NOW())
        RETURNING {}
        "#,
        REWARD_COLUMNS
    );
    let reward = sqlx::query_as::<_, LevelReward>(&sql)
        .bind(req.level)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.stock)
        .fetch_one(&state.pool)
        .await?;

    info!(reward_id = reward.id, name = %reward.name, "Reward created");
    Ok(Json(ApiResponse::success(reward)))
}

/// 更新奖励
///
/// PUT /api/admin/rewards/{id}
pub async fn update_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRewardRequest>,
) -> Result<Json<ApiResponse<LevelReward>>> {
    req.validate()?;

    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM level_rewards WHERE id = $1)")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if !exists.0 {
        return Err(ApiError::RewardNotFound(id));
    }

    let sql = format!(
        r#"
        UPDATE level_rewards
        SET level = COALESCE($2, level),
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            stock = COALESCE($5, stock),
            status = COALESCE($6, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        REWARD_COLUMNS
    );
    let reward = sqlx::query_as::<_, LevelReward>(&sql)
        .bind(id)
        .bind(req.level)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.stock)
        .bind(req.status.map(db_enum_str))
        .fetch_one(&state.pool)
        .await?;

    info!(reward_id = id, "Reward updated");
    Ok(Json(ApiResponse::success(reward)))
}

/// 删除奖励
///
/// 已有领取记录的奖励不可删除，应改为停用
///
/// DELETE /api/admin/rewards/{id}
pub async fn delete_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let has_claims: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM reward_claims WHERE reward_id = $1)")
            .bind(id)
            .fetch_one(&state.pool)
            .await?;
    if has_claims.0 {
        return Err(ApiError::Validation(
            "奖励已有领取记录，请改为停用".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM level_rewards WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::RewardNotFound(id));
    }

    info!(reward_id = id, "Reward deleted");
    Ok(Json(ApiResponse::<()>::success_empty()))
}
