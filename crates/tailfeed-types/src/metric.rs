//! Metrics snapshot emitted with every run result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of accumulated counters and timing aggregates.
///
/// Derived, recomputed on demand; `avg_processing_ms` and
/// `max_processing_ms` are `0.0` when no timings were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub avg_processing_ms: f64,
    pub max_processing_ms: f64,
    pub total_events_measured: u64,
}
