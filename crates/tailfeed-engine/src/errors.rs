//! Engine error model.
//!
//! Only configuration and protocol errors, plus handler errors when
//! `continue_on_error` is disabled, surface to the caller of `run()`;
//! everything else is absorbed into counters and the dead-letter channel.

use thiserror::Error;

use crate::result::RunResult;

/// Categorized ingestion error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any side effect (bad retry policy, etc.).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Rejected helper/simulator input, before any side effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The source violated the pagination contract. Never retried, and
    /// no cursor commit happens for the offending page.
    #[error("source protocol violation: {0}")]
    Protocol(String),

    /// An event exhausted its retry budget with `continue_on_error`
    /// disabled.
    #[error("event {event_id} failed after {attempts} attempts: {source}")]
    HandlerExhausted {
        event_id: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The source itself failed (fetch, cursor read, or commit).
    #[error("source {operation} failed: {source}")]
    Source {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// A failed run, carrying everything processed before the abort.
///
/// The last successfully committed cursor in `partial` is intact, so a
/// caller can inspect progress and decide whether to retry the whole run.
#[derive(Debug)]
pub struct RunFailure {
    pub error: EngineError,
    pub partial: RunResult,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ingestion run aborted: {}", self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_exhausted_display_includes_event_and_attempts() {
        let err = EngineError::HandlerExhausted {
            event_id: "DC_2".into(),
            attempts: 3,
            source: anyhow::anyhow!("handler timed out"),
        };
        let msg = err.to_string();
        assert!(msg.contains("DC_2"));
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("handler timed out"));
    }

    #[test]
    fn run_failure_preserves_partial_result() {
        let failure = RunFailure {
            error: EngineError::Protocol("non-empty page without end cursor".into()),
            partial: RunResult {
                processed_events: 5,
                ..RunResult::default()
            },
        };
        assert_eq!(failure.partial.processed_events, 5);
        assert!(failure.to_string().contains("protocol violation"));
    }
}
