//! 徽章获取条件评估
//!
//! 徽章条件是单一阈值：指定指标首次达到 threshold 即授予。
//! 评估器接收员工的指标快照和候选徽章列表（已上线、未获得），
//! 返回本次新达成的徽章。纯函数，结果确定。

use crate::models::Badge;
use crate::models::enums::{BadgeMetric, BadgeStatus};

/// 员工指标快照
///
/// 仅统计已通过审核的行动记录
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub total_points: i64,
    pub actions_count: i64,
    pub co2_saved_grams: i64,
    pub challenges_completed: i64,
    pub streak_days: i64,
}

impl MetricSnapshot {
    /// 取出指定指标的当前值
    pub fn value_of(&self, metric: BadgeMetric) -> i64 {
        match metric {
            BadgeMetric::TotalPoints => self.total_points,
            BadgeMetric::ActionsCount => self.actions_count,
            BadgeMetric::Co2SavedGrams => self.co2_saved_grams,
            BadgeMetric::ChallengesCompleted => self.challenges_completed,
            BadgeMetric::StreakDays => self.streak_days,
        }
    }
}

/// 徽章评估器
pub struct BadgeEvaluator;

impl BadgeEvaluator {
    /// 评估候选徽章，返回新达成的徽章 ID 列表
    ///
    /// 调用方负责传入「已上线且该员工尚未获得」的候选集；
    /// 评估器仍会跳过非 Active 状态的徽章作为兜底。
    pub fn evaluate(snapshot: &MetricSnapshot, candidates: &[Badge]) -> Vec<i64> {
        candidates
            .iter()
            .filter(|b| b.status == BadgeStatus::Active)
            .filter(|b| snapshot.value_of(b.metric) >= b.threshold)
            .map(|b| b.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn badge(id: i64, metric: BadgeMetric, threshold: i64, status: BadgeStatus) -> Badge {
        Badge {
            id,
            name: format!("badge-{}", id),
            description: None,
            icon_url: None,
            metric,
            threshold,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_badge_earned_exactly_at_threshold() {
        let snapshot = MetricSnapshot {
            total_points: 100,
            ..Default::default()
        };
        let candidates = vec![badge(1, BadgeMetric::TotalPoints, 100, BadgeStatus::Active)];
        assert_eq!(BadgeEvaluator::evaluate(&snapshot, &candidates), vec![1]);
    }

    #[test]
    fn test_badge_not_earned_below_threshold() {
        let snapshot = MetricSnapshot {
            total_points: 99,
            ..Default::default()
        };
        let candidates = vec![badge(1, BadgeMetric::TotalPoints, 100, BadgeStatus::Active)];
        assert!(BadgeEvaluator::evaluate(&snapshot, &candidates).is_empty());
    }

    #[test]
    fn test_multiple_metrics_evaluated_independently() {
        let snapshot = MetricSnapshot {
            total_points: 500,
            actions_count: 3,
            co2_saved_grams: 20_000,
            challenges_completed: 1,
            streak_days: 7,
        };
        let candidates = vec![
            badge(1, BadgeMetric::TotalPoints, 100, BadgeStatus::Active),
            badge(2, BadgeMetric::ActionsCount, 10, BadgeStatus::Active),
            badge(3, BadgeMetric::Co2SavedGrams, 10_000, BadgeStatus::Active),
            badge(4, BadgeMetric::StreakDays, 7, BadgeStatus::Active),
        ];
        assert_eq!(
            BadgeEvaluator::evaluate(&snapshot, &candidates),
            vec![1, 3, 4]
        );
    }

    #[test]
    fn test_non_active_badges_are_skipped() {
        let snapshot = MetricSnapshot {
            total_points: 1000,
            ..Default::default()
        };
        let candidates = vec![
            badge(1, BadgeMetric::TotalPoints, 100, BadgeStatus::Draft),
            badge(2, BadgeMetric::TotalPoints, 100, BadgeStatus::Retired),
        ];
        assert!(BadgeEvaluator::evaluate(&snapshot, &candidates).is_empty());
    }
}
