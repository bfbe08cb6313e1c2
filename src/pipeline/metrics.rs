//! Size and latency metrics for a pipeline run

use std::time::{Duration, Instant};

/// Percentage of the input removed by compression, one decimal place with a
/// trailing `%`.
///
/// Negative when the service grew the input; not clamped. The raw size is
/// floored to 1, so an empty input never divides by zero.
pub fn compression_ratio_percent(raw_size: usize, compressed_size: usize) -> String {
    #[allow(clippy::cast_precision_loss)]
    let ratio = 100.0 * (1.0 - compressed_size as f64 / raw_size.max(1) as f64);
    format!("{:.1}%", normalize_zero(ratio))
}

/// Render a backend-provided fraction (`0.5`) as a percentage string (`50.0%`).
pub fn fraction_to_percent(fraction: f64) -> String {
    format!("{:.1}%", normalize_zero(fraction * 100.0))
}

/// `-0.0` formats as "-0.0"; collapse it.
fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Wall-clock timer around one stage
#[derive(Debug, Clone, Copy)]
pub struct StageTimer {
    started: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> f64 {
        duration_ms(self.started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_compression() {
        assert_eq!(compression_ratio_percent(100, 50), "50.0%");
    }

    #[test]
    fn test_zero_raw_size_no_division_by_zero() {
        assert_eq!(compression_ratio_percent(0, 0), "0.0%");
    }

    #[test]
    fn test_zero_raw_size_with_output_is_negative() {
        // Denominator floors to 1: 100 * (1 - 12/1)
        assert_eq!(compression_ratio_percent(0, 12), "-1100.0%");
        assert_eq!(compression_ratio_percent(0, 1), "0.0%");
    }

    #[test]
    fn test_negative_ratio_not_clamped() {
        assert_eq!(compression_ratio_percent(100, 150), "-50.0%");
    }

    #[test]
    fn test_no_change_is_zero() {
        assert_eq!(compression_ratio_percent(80, 80), "0.0%");
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        // 1 - 2/3 = 33.333...
        assert_eq!(compression_ratio_percent(3, 2), "33.3%");
    }

    #[test]
    fn test_fraction_to_percent() {
        assert_eq!(fraction_to_percent(0.5), "50.0%");
        assert_eq!(fraction_to_percent(-0.25), "-25.0%");
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500.0);
    }

    #[test]
    fn test_timer_is_monotonic() {
        let t = StageTimer::start();
        assert!(t.elapsed_ms() >= 0.0);
    }
}
