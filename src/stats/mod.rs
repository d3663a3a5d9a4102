//! Ingestion statistics
//!
//! The control loop is the only writer; the command thread reads the counters
//! concurrently to answer `info`. Counters are plain atomics, so a reader may
//! observe a value that is a few events stale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Floor for the elapsed time used in rate computation, in seconds
const MIN_ELAPSED_SECS: f64 = 1e-3;

/// Event counter and timer shared between the control loop and the operator
#[derive(Debug)]
pub struct StatsTracker {
    events: AtomicU64,
    connection_attempts: AtomicU64,
    rotations: AtomicU64,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            events: AtomicU64::new(0),
            connection_attempts: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Count one event written to the sink
    pub fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_attempt(&self) {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn connection_attempts(&self) -> u64 {
        self.connection_attempts.load(Ordering::Relaxed)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Snapshot the counters and derive the throughput
    pub fn summary(&self) -> StatsSummary {
        let events = self.event_count();
        let elapsed = self.started.elapsed();
        let rate = events as f64 / elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);

        StatsSummary {
            events,
            rate,
            elapsed,
            connection_attempts: self.connection_attempts(),
            rotations: self.rotations(),
            started_at: self.started_at,
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    /// Events written so far
    pub events: u64,
    /// Events per second since start
    pub rate: f64,
    /// Time since tracking started
    pub elapsed: Duration,
    pub connection_attempts: u64,
    pub rotations: u64,
    pub started_at: DateTime<Utc>,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} events @ {:.3} events/s", self.events, self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_summary_immediately_after_start() {
        let stats = StatsTracker::new();
        stats.record_event();

        let summary = stats.summary();
        assert_eq!(summary.events, 1);
        assert!(summary.rate.is_finite());
        assert!(summary.rate >= 0.0);
    }

    #[test]
    fn test_empty_summary_has_zero_rate() {
        let summary = StatsTracker::new().summary();
        assert_eq!(summary.events, 0);
        assert_eq!(summary.rate, 0.0);
        assert_eq!(summary.to_string(), "0 events @ 0.000 events/s");
    }

    #[test]
    fn test_auxiliary_counters() {
        let stats = StatsTracker::default();
        stats.record_connection_attempt();
        stats.record_connection_attempt();
        stats.record_rotation();

        let summary = stats.summary();
        assert_eq!(summary.connection_attempts, 2);
        assert_eq!(summary.rotations, 1);
        assert!(summary.started_at <= Utc::now());
    }

    #[test]
    fn test_count_is_monotonic_under_concurrent_reads() {
        let stats = Arc::new(StatsTracker::new());

        let reader = {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..1_000 {
                    let summary = stats.summary();
                    assert!(summary.events >= last);
                    assert!(summary.rate.is_finite() && summary.rate >= 0.0);
                    last = summary.events;
                }
            })
        };

        for _ in 0..10_000 {
            stats.record_event();
        }
        reader.join().unwrap();

        assert_eq!(stats.event_count(), 10_000);
    }
}
