//! In-memory latency histogram for refresh instrumentation.
//! Records the wall time of a full cycle: both fetches, merge and valuation.

use std::sync::Mutex;
use std::time::Duration;

/// Shared latency stats. Refresher records, API reads.
/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl LatencyStats {
    /// Tracks 1us to 10 minutes, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 600_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            // Values past the upper bound are clamped rather than dropped.
            h.saturating_record(us.max(1));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_ms, p95_ms, p99_ms, max_ms). None if no samples.
    pub fn percentiles_ms(&self) -> Option<(f64, f64, f64, f64)> {
        let h = self.inner.lock().ok()?;
        if h.len() == 0 {
            return None;
        }
        let ms = |us: u64| us as f64 / 1_000.0;
        Some((
            ms(h.value_at_quantile(0.5)),
            ms(h.value_at_quantile(0.95)),
            ms(h.value_at_quantile(0.99)),
            ms(h.max()),
        ))
    }

    /// Sample count.
    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(stats.len(), 0);
        assert!(stats.percentiles_ms().is_none());
    }

    #[test]
    fn records_cycle_durations() {
        let stats = LatencyStats::new();
        for ms in [10, 20, 30, 40, 2_000] {
            stats.record(Duration::from_millis(ms));
        }
        let (p50, _, p99, max) = stats.percentiles_ms().expect("samples");
        assert_eq!(stats.len(), 5);
        assert!((p50 - 30.0).abs() < 0.1, "p50={p50}");
        assert!(p99 >= 1_990.0, "p99={p99}");
        assert!(max >= p99);
    }

    #[test]
    fn oversized_samples_are_clamped() {
        let stats = LatencyStats::new();
        stats.record(Duration::from_secs(3_600));
        assert_eq!(stats.len(), 1);
    }
}
