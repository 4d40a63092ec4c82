//! In-memory counters and timing samples.

use std::collections::BTreeMap;

use tailfeed_types::MetricsSnapshot;

/// Accumulates named counters and per-event processing timings.
///
/// Counters only ever increase. Timing samples are unbounded for the
/// lifetime of the collector; `snapshot()` is pure and can be called any
/// number of times.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: BTreeMap<String, u64>,
    timings_ms: Vec<f64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add 1 to a named counter.
    pub fn increment(&mut self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Add `value` to a named counter, creating it at zero if absent.
    pub fn increment_by(&mut self, name: &str, value: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    /// Record one processing duration in milliseconds.
    pub fn record_timing(&mut self, elapsed_ms: f64) {
        self.timings_ms.push(elapsed_ms);
    }

    /// Copy of the counters plus avg/max over recorded timings.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.timings_ms.len() as u64;
        let (avg, max) = if self.timings_ms.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = self.timings_ms.iter().sum();
            let max = self.timings_ms.iter().cloned().fold(f64::MIN, f64::max);
            (sum / self.timings_ms.len() as f64, max)
        };
        MetricsSnapshot {
            counters: self.counters.clone(),
            avg_processing_ms: avg,
            max_processing_ms: max,
            total_events_measured: total,
        }
    }
}
