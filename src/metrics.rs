//! Metrics sink — side-channel counters and measurements.
//!
//! DESIGN
//! ======
//! Services report through the `MetricsSink` trait so tests can record
//! events. The default sink emits one structured `tracing` event per call on
//! the `metrics` target, formatted as `count#name=value` or
//! `measure#name=value` so log scrapers can pick them up.

pub const QUEUE_ENTERED: &str = "queue.entered";
pub const GROUP_CLOSED_FULL: &str = "group.closed.full";
pub const GROUP_CLOSED_TIMEOUT: &str = "group.closed.timeout";
pub const GROUP_MEMBER_PURGED: &str = "group.member_purged";
pub const MATCH_LATENCY_MS: &str = "match.latency_ms";
pub const NOTIFICATION_HELD: &str = "notification.held";
pub const NOTIFICATION_ATTEMPTED: &str = "notification.attempted";
pub const NOTIFICATION_FAILED: &str = "notification.failed";

pub trait MetricsSink: Send + Sync {
    /// Add `value` to the counter `name`.
    fn count(&self, name: &str, value: u64);

    /// Record a single observation (latency, size) for `name`.
    fn measure(&self, name: &str, value: u64);

    fn increment(&self, name: &str) {
        self.count(name, 1);
    }
}

/// Writes every metric as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn count(&self, name: &str, value: u64) {
        tracing::info!(target: "metrics", kind = "count", metric = name, value, "count#{name}={value}");
    }

    fn measure(&self, name: &str, value: u64) {
        tracing::info!(target: "metrics", kind = "measure", metric = name, value, "measure#{name}={value}");
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;

    use super::MetricsSink;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Recorded {
        Count(String, u64),
        Measure(String, u64),
    }

    /// Sink that keeps every call for later assertions.
    #[derive(Default)]
    pub struct RecordingMetrics {
        events: Mutex<Vec<Recorded>>,
    }

    impl RecordingMetrics {
        /// Sum of all `count` values recorded for `name`.
        pub fn total(&self, name: &str) -> u64 {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Recorded::Count(n, v) if n == name => Some(*v),
                    _ => None,
                })
                .sum()
        }

        /// All `measure` values recorded for `name`, in order.
        pub fn measurements(&self, name: &str) -> Vec<u64> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Recorded::Measure(n, v) if n == name => Some(*v),
                    _ => None,
                })
                .collect()
        }
    }

    impl MetricsSink for RecordingMetrics {
        fn count(&self, name: &str, value: u64) {
            self.events.lock().unwrap().push(Recorded::Count(name.into(), value));
        }

        fn measure(&self, name: &str, value: u64) {
            self.events.lock().unwrap().push(Recorded::Measure(name.into(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::RecordingMetrics;
    use super::*;

    #[test]
    fn increment_counts_one() {
        let metrics = RecordingMetrics::default();
        metrics.increment(QUEUE_ENTERED);
        metrics.increment(QUEUE_ENTERED);
        metrics.count(NOTIFICATION_ATTEMPTED, 3);
        assert_eq!(metrics.total(QUEUE_ENTERED), 2);
        assert_eq!(metrics.total(NOTIFICATION_ATTEMPTED), 3);
        assert_eq!(metrics.total(NOTIFICATION_FAILED), 0);
    }

    #[test]
    fn measurements_are_kept_separate_from_counts() {
        let metrics = RecordingMetrics::default();
        metrics.measure(MATCH_LATENCY_MS, 1200);
        metrics.count(MATCH_LATENCY_MS, 1);
        assert_eq!(metrics.measurements(MATCH_LATENCY_MS), vec![1200]);
        assert_eq!(metrics.total(MATCH_LATENCY_MS), 1);
    }

    #[test]
    fn log_metrics_does_not_panic_without_subscriber() {
        LogMetrics.increment(GROUP_CLOSED_FULL);
        LogMetrics.measure(MATCH_LATENCY_MS, 5);
    }
}
