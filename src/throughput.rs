use std::time::Duration;

use humansize::{format_size, DECIMAL};

/// Smoothing factor for the rate's exponential moving average.
const SMOOTHING_FACTOR: f64 = 0.2;

/// Smoothed transfer rate and ETA from cumulative progress.
///
/// Feed it the cumulative byte count and the elapsed time since execution
/// started; each update folds the instantaneous rate into an exponential
/// moving average seeded by the first sample.
#[derive(Debug, Default)]
pub struct ThroughputEstimator {
    ema_bytes_per_sec: Option<f64>,
}

impl ThroughputEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a sample and return the smoothed rate in bytes/second.
    /// Zero elapsed time leaves the average untouched.
    pub fn update(&mut self, done_bytes: u64, elapsed: Duration) -> f64 {
        let seconds = elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return self.rate();
        }

        let instantaneous = done_bytes as f64 / seconds;
        let smoothed = match self.ema_bytes_per_sec {
            Some(previous) => {
                SMOOTHING_FACTOR * instantaneous + (1.0 - SMOOTHING_FACTOR) * previous
            }
            None => instantaneous,
        };
        self.ema_bytes_per_sec = Some(smoothed);
        smoothed
    }

    pub fn rate(&self) -> f64 {
        self.ema_bytes_per_sec.unwrap_or(0.0)
    }

    /// Estimated time to completion, or `None` while the rate is unknown or
    /// not positive.
    pub fn eta(&self, total_bytes: u64, done_bytes: u64) -> Option<Duration> {
        let rate = self.ema_bytes_per_sec?;
        if rate <= 0.0 {
            return None;
        }
        let remaining = total_bytes.saturating_sub(done_bytes) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }
}

pub fn format_rate(bytes_per_second: f64) -> String {
    format!("{}/s", format_size(bytes_per_second.max(0.0) as u64, DECIMAL))
}

pub fn format_eta(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return "--".to_string();
    };

    let total_seconds = eta.as_secs();
    if total_seconds < 60 {
        format!("{total_seconds}s")
    } else if total_seconds < 3600 {
        format!("{}m{}s", total_seconds / 60, total_seconds % 60)
    } else {
        format!("{}h{}m", total_seconds / 3600, (total_seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let mut estimator = ThroughputEstimator::new();
        let rate = estimator.update(1000, Duration::from_secs(1));
        assert_eq!(rate, 1000.0);
    }

    #[test]
    fn later_samples_are_smoothed() {
        let mut estimator = ThroughputEstimator::new();
        estimator.update(1000, Duration::from_secs(1));

        // Cumulative 4000 bytes over 2s → instantaneous 2000 B/s.
        let rate = estimator.update(4000, Duration::from_secs(2));
        let expected = 0.2 * 2000.0 + 0.8 * 1000.0;
        assert!((rate - expected).abs() < 1e-9, "got {rate}");
    }

    #[test]
    fn eta_unknown_before_any_sample() {
        let estimator = ThroughputEstimator::new();
        assert_eq!(estimator.eta(1000, 0), None);
        assert_eq!(estimator.rate(), 0.0);
    }

    #[test]
    fn eta_unknown_when_rate_is_zero() {
        let mut estimator = ThroughputEstimator::new();
        estimator.update(0, Duration::from_secs(5));
        assert_eq!(estimator.eta(1000, 0), None);
    }

    #[test]
    fn eta_divides_remaining_by_smoothed_rate() {
        let mut estimator = ThroughputEstimator::new();
        estimator.update(500, Duration::from_secs(1));

        let eta = estimator.eta(1500, 500).unwrap();
        assert_eq!(eta, Duration::from_secs(2));
    }

    #[test]
    fn zero_elapsed_does_not_disturb_the_average() {
        let mut estimator = ThroughputEstimator::new();
        estimator.update(1000, Duration::from_secs(1));
        let rate = estimator.update(9999, Duration::ZERO);
        assert_eq!(rate, 1000.0);
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_rate(1000.0), "1 kB/s");
        assert_eq!(format_eta(None), "--");
        assert_eq!(format_eta(Some(Duration::from_secs(42))), "42s");
        assert_eq!(format_eta(Some(Duration::from_secs(90))), "1m30s");
        assert_eq!(format_eta(Some(Duration::from_secs(3720))), "1h2m");
    }
}
