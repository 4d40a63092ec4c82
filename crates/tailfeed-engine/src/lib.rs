//! Checkpointed, at-least-once ingestion engine for paginated event streams.
//!
//! The engine pulls pages from an [`EventSource`], applies an
//! [`EventHandler`] to each event under a bounded retry policy, diverts
//! permanently-failed events to a [`DeadLetterSink`], and commits the
//! source cursor once a page is fully handled.

pub mod contracts;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod result;
pub mod retry;
pub mod shard;
pub mod simulator;

pub use contracts::{DeadLetterSink, EventHandler, EventSource};
pub use engine::{Engine, EngineOptions};
pub use errors::{EngineError, RunFailure};
pub use metrics::MetricsCollector;
pub use result::RunResult;
pub use retry::{with_retry, RetryError, RetryPolicy};
