//! Attempt latency summary.

use std::time::Duration;

use serde::Serialize;

/// Summary of per-attempt latencies in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub mean: f64,
    pub std: f64,
    pub p50: f64,
    pub p90: f64,
    pub max: f64,
}

impl LatencyStats {
    /// Summarise a set of attempt durations. Empty input gives all zeros.
    pub fn from_durations<'a, I>(durations: I) -> Self
    where
        I: IntoIterator<Item = &'a Duration>,
    {
        let samples: Vec<f64> = durations
            .into_iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        calculate_stats(&samples)
    }
}

/// Compute statistics over samples (ms).
pub fn calculate_stats(samples: &[f64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }

    let m = mean(samples);
    let mut sorted: Vec<f64> = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    LatencyStats {
        samples: samples.len(),
        mean: m,
        std: std_dev(samples, m),
        p50: percentile(&sorted, 0.50),
        p90: percentile(&sorted, 0.90),
        max: sorted[sorted.len() - 1],
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile of ascending samples, linearly interpolated between ranks.
/// `p` is clamped to 0.0..=1.0.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [100.0, 200.0, 300.0, 400.0, 500.0];
        assert_eq!(mean(&values), 300.0);
        // sqrt(20000)
        assert!((std_dev(&values, 300.0) - 141.42).abs() < 0.1);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[], 0.0), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [100.0, 200.0, 300.0, 400.0, 500.0];
        assert_eq!(percentile(&sorted, 0.5), 300.0);
        // rank 3.6: 400 * 0.4 + 500 * 0.6
        assert_eq!(percentile(&sorted, 0.9), 460.0);
        assert_eq!(percentile(&sorted, 2.0), 500.0);
    }

    #[test]
    fn test_percentile_degenerate() {
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[42.0], 0.9), 42.0);
    }

    #[test]
    fn test_from_durations() {
        let durations = [
            Duration::from_millis(10),
            Duration::from_millis(30),
            Duration::from_millis(20),
        ];
        let stats = LatencyStats::from_durations(&durations);
        assert_eq!(stats.samples, 3);
        assert!((stats.mean - 20.0).abs() < 1e-9);
        assert!((stats.p50 - 20.0).abs() < 1e-9);
        assert!((stats.max - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_is_zeroed() {
        let stats = LatencyStats::from_durations(&Vec::<Duration>::new());
        assert_eq!(stats, LatencyStats::default());
    }
}
