//! 挑战进度计算
//!
//! 参与者进度 = 挑战窗口内累计的指标增量，达到 target_value 即完成。
//! 展示用百分比做 100 上限截断。

/// 展示用进度百分比，上限截断为 100
pub fn challenge_progress_percent(progress: i64, target_value: i64) -> f64 {
    if target_value <= 0 {
        // 目标为零的挑战视为已完成，避免除零
        return 100.0;
    }
    ((progress as f64 / target_value as f64) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_basic() {
        assert!((challenge_progress_percent(50, 200) - 25.0).abs() < f64::EPSILON);
        assert_eq!(challenge_progress_percent(0, 200), 0.0);
    }

    #[test]
    fn test_progress_percent_clamped_at_hundred() {
        assert_eq!(challenge_progress_percent(500, 200), 100.0);
    }

    #[test]
    fn test_zero_target_is_complete() {
        assert_eq!(challenge_progress_percent(0, 0), 100.0);
    }
}
