//! 挑战生命周期 Worker
//!
//! 按 cron 计划扫描挑战表，把窗口已关闭的进行中挑战转为已结束，
//! 结束后结果固定。挑战上线由管理端发布操作触发，不走定时任务。
//!
//! 使用 `FOR UPDATE SKIP LOCKED` 保证多实例部署时不会重复处理。

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use greenloop_shared::observability::metrics as obs_metrics;
use sqlx::PgPool;
use tracing::{error, info, warn};

/// 默认调度计划：每分钟执行一次
const DEFAULT_CRON: &str = "0 * * * * *";

/// 挑战生命周期 Worker
pub struct ChallengeLifecycleWorker {
    pool: PgPool,
    schedule: Schedule,
    batch_size: i64,
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    id: i64,
    name: String,
}

impl ChallengeLifecycleWorker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            // 常量表达式，解析必定成功
            schedule: Schedule::from_str(DEFAULT_CRON).unwrap(),
            batch_size: 100,
        }
    }

    /// 创建带自定义调度的 Worker（主要用于测试）
    pub fn with_schedule(pool: PgPool, cron_expr: &str, batch_size: i64) -> anyhow::Result<Self> {
        Ok(Self {
            pool,
            schedule: Schedule::from_str(cron_expr)?,
            batch_size,
        })
    }

    /// 主循环：按 cron 计划持续运行直到进程退出
    pub async fn run(&self) {
        info!(batch_size = self.batch_size, "ChallengeLifecycleWorker 已启动");

        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("cron 计划没有后续触发时间，Worker 退出");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            if let Err(e) = self.tick(&self.pool).await {
                error!(error = %e, "挑战生命周期处理出错");
            }

            obs_metrics::set_worker_last_run("challenge_worker");
        }
    }

    /// 单轮处理：结束到期挑战
    async fn tick(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let ended = self.complete_ended_challenges(pool).await?;
        if ended > 0 {
            info!(count = ended, "挑战窗口关闭，已结束");
        }
        Ok(())
    }

    /// 将窗口已关闭的进行中挑战转为已结束
    ///
    /// 结束时不再累计进度，参与者的 completed_at 保持审核路径写入的值
    async fn complete_ended_challenges(&self, pool: &PgPool) -> Result<usize, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let challenges = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, name
            FROM challenges
            WHERE status = 'active' AND ends_at <= $1
            ORDER BY ends_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(self.batch_size)
        .fetch_all(&mut *tx)
        .await?;

        if challenges.is_empty() {
            tx.rollback().await?;
            return Ok(0);
        }

        let ids: Vec<i64> = challenges.iter().map(|c| c.id).collect();

        sqlx::query(
            r#"
            UPDATE challenges
            SET status = 'completed', updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        for c in &challenges {
            metrics::counter!("challenges_completed_total").increment(1);
            info!(challenge_id = c.id, name = %c.name, "Challenge completed");
        }

        Ok(challenges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cron_parses() {
        let schedule = Schedule::from_str(DEFAULT_CRON).unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn test_invalid_cron_rejected() {
        assert!(Schedule::from_str("not a cron").is_err());
    }
}
