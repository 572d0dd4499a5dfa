//! 等级与升级进度计算
//!
//! 给定员工累计积分和按等级排序的积分阈值表，计算当前等级、
//! 距下一等级所需积分和进度百分比。阈值表很短（约 10 条），
//! 采用 O(n) 线性扫描，每次请求实时重算，不做缓存。

use serde::{Deserialize, Serialize};

/// 等级阈值
///
/// points_required 为进入该等级所需的累计积分，约定按等级递增
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LevelThreshold {
    pub level: i32,
    pub name: String,
    pub points_required: i64,
}

/// 等级进度计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// 当前等级
    pub level: i32,
    /// 当前等级名称（降级公式计算时为空）
    pub level_name: Option<String>,
    /// 累计积分
    pub points: i64,
    /// 距下一等级还需的积分，已满级时为空
    pub points_to_next: Option<i64>,
    /// 当前等级区间内的进度百分比，满级时恒为 100
    pub progress_percent: f64,
}

/// 计算等级进度
///
/// 在阈值表中找到最后一个 `points_required <= points` 的等级作为当前等级，
/// 下一条作为升级目标：
///
/// - `points_to_next = next.points_required - points`
/// - `progress_percent = (points - cur.required) / (next.required - cur.required) * 100`
///
/// 没有下一等级时视为满级，进度固定为 100。
/// 阈值表为空时退回简化公式（见 [`fallback_level_progress`]）。
///
/// 积分低于首条阈值时视为 1 级，进度从 0 起算到首条阈值。
pub fn compute_level_progress(points: i64, thresholds: &[LevelThreshold]) -> LevelProgress {
    if thresholds.is_empty() {
        return fallback_level_progress(points);
    }

    // 容忍乱序数据：按 points_required 排序后扫描
    let mut sorted: Vec<&LevelThreshold> = thresholds.iter().collect();
    sorted.sort_by_key(|t| t.points_required);

    // 当前等级 = 最后一个阈值 <= points 的条目
    let current_idx = sorted.iter().rposition(|t| t.points_required <= points);

    match current_idx {
        None => {
            // 积分低于首条阈值：按 1 级处理，进度从 0 到首条阈值
            let first = sorted[0];
            let progress = if first.points_required > 0 {
                (points as f64 / first.points_required as f64) * 100.0
            } else {
                0.0
            };
            LevelProgress {
                level: 1,
                level_name: None,
                points,
                points_to_next: Some(first.points_required - points),
                progress_percent: progress.clamp(0.0, 100.0),
            }
        }
        Some(idx) => {
            let current = sorted[idx];
            match sorted.get(idx + 1) {
                Some(next) => {
                    let span = next.points_required - current.points_required;
                    let progress = if span > 0 {
                        ((points - current.points_required) as f64 / span as f64) * 100.0
                    } else {
                        // 阈值重复时区间为零，直接视为已完成该区间
                        100.0
                    };
                    LevelProgress {
                        level: current.level,
                        level_name: Some(current.name.clone()),
                        points,
                        points_to_next: Some(next.points_required - points),
                        progress_percent: progress.clamp(0.0, 100.0),
                    }
                }
                None => LevelProgress {
                    // 满级：无下一等级，进度固定 100
                    level: current.level,
                    level_name: Some(current.name.clone()),
                    points,
                    points_to_next: None,
                    progress_percent: 100.0,
                },
            }
        }
    }
}

/// 简化降级公式
///
/// 阈值数据缺失时使用：每 100 分升 1 级，区间内进度即积分余数
pub fn fallback_level_progress(points: i64) -> LevelProgress {
    let points = points.max(0);
    let level = (points / 100 + 1) as i32;
    let remainder = points % 100;
    LevelProgress {
        level,
        level_name: None,
        points,
        points_to_next: Some(100 - remainder),
        progress_percent: remainder as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Vec<LevelThreshold> {
        vec![
            LevelThreshold {
                level: 1,
                name: "种子".to_string(),
                points_required: 0,
            },
            LevelThreshold {
                level: 2,
                name: "嫩芽".to_string(),
                points_required: 100,
            },
            LevelThreshold {
                level: 3,
                name: "小树".to_string(),
                points_required: 300,
            },
            LevelThreshold {
                level: 4,
                name: "森林".to_string(),
                points_required: 1000,
            },
        ]
    }

    #[test]
    fn test_zero_points_is_level_one_at_zero_percent() {
        let p = compute_level_progress(0, &thresholds());
        assert_eq!(p.level, 1);
        assert_eq!(p.points_to_next, Some(100));
        assert_eq!(p.progress_percent, 0.0);
    }

    #[test]
    fn test_mid_interval_percentage() {
        // 等级 2 区间 [100, 300)，150 分应为 25%
        let p = compute_level_progress(150, &thresholds());
        assert_eq!(p.level, 2);
        assert_eq!(p.level_name.as_deref(), Some("嫩芽"));
        assert_eq!(p.points_to_next, Some(150));
        assert!((p.progress_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exactly_at_threshold_is_zero_percent() {
        let p = compute_level_progress(300, &thresholds());
        assert_eq!(p.level, 3);
        assert_eq!(p.points_to_next, Some(700));
        assert_eq!(p.progress_percent, 0.0);
    }

    #[test]
    fn test_max_level_clamps_to_hundred() {
        let p = compute_level_progress(5000, &thresholds());
        assert_eq!(p.level, 4);
        assert_eq!(p.points_to_next, None);
        assert_eq!(p.progress_percent, 100.0);

        // 恰好到达最高阈值同样是满级
        let p = compute_level_progress(1000, &thresholds());
        assert_eq!(p.level, 4);
        assert_eq!(p.progress_percent, 100.0);
    }

    #[test]
    fn test_points_below_first_threshold() {
        // 阈值表不含 0 起点时，低于首条阈值按 1 级处理
        let t = vec![
            LevelThreshold {
                level: 1,
                name: "种子".to_string(),
                points_required: 50,
            },
            LevelThreshold {
                level: 2,
                name: "嫩芽".to_string(),
                points_required: 200,
            },
        ];
        let p = compute_level_progress(25, &t);
        assert_eq!(p.level, 1);
        assert_eq!(p.points_to_next, Some(25));
        assert!((p.progress_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unsorted_thresholds_are_tolerated() {
        let mut t = thresholds();
        t.reverse();
        let p = compute_level_progress(150, &t);
        assert_eq!(p.level, 2);
        assert_eq!(p.points_to_next, Some(150));
    }

    #[test]
    fn test_empty_thresholds_falls_back() {
        let p = compute_level_progress(250, &[]);
        assert_eq!(p.level, 3);
        assert_eq!(p.points_to_next, Some(50));
        assert!((p.progress_percent - 50.0).abs() < f64::EPSILON);
        assert!(p.level_name.is_none());
    }

    #[test]
    fn test_fallback_negative_points_treated_as_zero() {
        let p = fallback_level_progress(-10);
        assert_eq!(p.level, 1);
        assert_eq!(p.progress_percent, 0.0);
    }

    #[test]
    fn test_duplicate_threshold_does_not_divide_by_zero() {
        let t = vec![
            LevelThreshold {
                level: 1,
                name: "a".to_string(),
                points_required: 0,
            },
            LevelThreshold {
                level: 2,
                name: "b".to_string(),
                points_required: 100,
            },
            LevelThreshold {
                level: 3,
                name: "c".to_string(),
                points_required: 100,
            },
        ];
        let p = compute_level_progress(100, &t);
        // 区间宽度为零时进度直接视为 100，不产生 NaN
        assert!(p.progress_percent.is_finite());
    }
}
