//! Tick-time statistics for the diagnostics readout.
//!
//! The frame driver records the wall-clock duration of every tick here. Only
//! a bounded window of recent samples is kept so a long-running page does not
//! grow without limit.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Default number of samples kept (one minute at the default 100ms cadence).
pub const DEFAULT_WINDOW: usize = 600;

/// Percentile summary of recent durations, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimingHistogram {
    pub count: u64,
    pub last_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub mean_us: u64,
}

/// Rolling window of tick durations.
#[derive(Debug, Clone)]
pub struct TickStats {
    window: usize,
    samples: VecDeque<u64>,
    total_ticks: u64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TickStats {
    /// Create a collector keeping at most `window` samples (minimum 1).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            total_ticks: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed.as_micros() as u64);
        self.total_ticks += 1;
    }

    /// Ticks recorded since creation, including ones that left the window.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Summarize the samples currently in the window.
    #[must_use]
    pub fn summary(&self) -> TimingHistogram {
        let Some(&last_us) = self.samples.back() else {
            return TimingHistogram::default();
        };
        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        TimingHistogram {
            count: sorted.len() as u64,
            last_us,
            min_us: sorted[0],
            max_us: sorted[sorted.len() - 1],
            p50_us: percentile(&sorted, 0.50),
            p95_us: percentile(&sorted, 0.95),
            mean_us: sorted.iter().sum::<u64>() / sorted.len() as u64,
        }
    }
}

fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_summarize_to_zero() {
        assert_eq!(TickStats::default().summary(), TimingHistogram::default());
    }

    #[test]
    fn summary_over_window() {
        let mut stats = TickStats::new(4);
        for ms in [4, 1, 3, 2] {
            stats.record(Duration::from_millis(ms));
        }
        let s = stats.summary();
        assert_eq!(s.count, 4);
        assert_eq!(s.last_us, 2_000);
        assert_eq!(s.min_us, 1_000);
        assert_eq!(s.max_us, 4_000);
        assert_eq!(s.mean_us, 2_500);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut stats = TickStats::new(2);
        stats.record(Duration::from_millis(100));
        stats.record(Duration::from_millis(1));
        stats.record(Duration::from_millis(2));
        let s = stats.summary();
        assert_eq!(s.count, 2);
        assert_eq!(s.max_us, 2_000);
        assert_eq!(stats.total_ticks(), 3);
    }
}
