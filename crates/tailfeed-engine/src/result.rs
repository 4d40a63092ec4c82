//! Run result types.

use serde::Serialize;

use tailfeed_types::{Cursor, MetricsSnapshot};

/// Outcome of one `run()` invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    /// Events handled successfully.
    pub processed_events: u64,
    /// Pages fully handled and committed.
    pub processed_pages: u64,
    /// Events that exhausted their retry budget.
    pub failures: u64,
    /// End cursor of the last fully-handled page, `None` if no page was
    /// committed this run.
    pub last_committed_cursor: Option<Cursor>,
    /// The run stopped on `max_pages_per_run` rather than end-of-stream.
    pub exhausted_by_max_pages: bool,
    /// Metrics snapshot taken when the run ended.
    pub metrics: MetricsSnapshot,
}
