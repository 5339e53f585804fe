//! 📊 stats.rs: "How many cars made it?" The only question management ever asks.
//!
//! Two counters that only go up, a start time that never moves, and a rate derived
//! from both. Lock-free, I/O-free, failure-free.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 📊 Delivered and failed record counts since the dispatcher was built.
#[derive(Debug)]
pub struct Statistics {
    delivered: AtomicU64,
    failed: AtomicU64,
    start_time: Instant,
}

/// 📸 A point-in-time read of [`Statistics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub rate_per_minute: f64,
    pub elapsed: Duration,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// ✅ Returns the delivered total *before* this call, so callers can spot milestones.
    pub(crate) fn record_delivered(&self, records: usize) -> u64 {
        self.delivered.fetch_add(records as u64, Ordering::Relaxed)
    }

    pub(crate) fn record_failed(&self, records: usize) {
        self.failed.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        StatisticsSnapshot {
            delivered,
            failed,
            rate_per_minute: rate_per_minute(delivered, elapsed),
            elapsed,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

// -- 💤 zero elapsed means zero rate, not infinity. we maintain composure.
fn rate_per_minute(delivered: u64, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes > 0.0 {
        delivered as f64 / minutes
    } else {
        0.0
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cars processed, {} errors, Rate: ~{} cars/min",
            self.delivered,
            self.failed,
            self.rate_per_minute.round() as u64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_counters_only_go_up() {
        let stats = Statistics::new();

        assert_eq!(stats.record_delivered(50), 0);
        assert_eq!(stats.record_delivered(25), 50);
        stats.record_failed(10);
        stats.record_failed(10);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.delivered, 75);
        assert_eq!(snapshot.failed, 20);
    }

    #[test]
    fn the_one_where_rate_is_per_minute() {
        assert_eq!(rate_per_minute(120, Duration::from_secs(60)), 120.0);
        assert_eq!(rate_per_minute(120, Duration::from_secs(30)), 240.0);
        assert_eq!(rate_per_minute(500, Duration::ZERO), 0.0);
    }

    #[test]
    fn the_one_where_the_summary_line_reads_like_a_human_wrote_it() {
        let snapshot = StatisticsSnapshot {
            delivered: 200,
            failed: 3,
            rate_per_minute: 1999.6,
            elapsed: Duration::from_secs(6),
        };
        assert_eq!(
            snapshot.to_string(),
            "200 cars processed, 3 errors, Rate: ~2000 cars/min"
        );
    }
}
