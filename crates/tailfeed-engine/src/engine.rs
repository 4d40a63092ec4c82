//! The pull → process(with retry) → dead-letter → checkpoint loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use tailfeed_types::{Cursor, DeadLetterRecord, MetricsSnapshot};

use crate::contracts::{DeadLetterSink, EventHandler, EventSource};
use crate::errors::{EngineError, RunFailure};
use crate::metrics::MetricsCollector;
use crate::result::RunResult;
use crate::retry::{with_retry, RetryError, RetryPolicy};

/// Engine configuration. All fields have working defaults.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Per-event retry budget and backoff shape.
    pub retry: RetryPolicy,
    /// Skip past exhausted events instead of aborting the run.
    pub continue_on_error: bool,
    /// Stop after this many pages; `None` runs to end-of-stream. Exists
    /// so the engine can be invoked from execution-time-limited hosts.
    pub max_pages_per_run: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            continue_on_error: false,
            max_pages_per_run: None,
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.retry.validate()
    }
}

/// Counters for the run in flight; folded into a [`RunResult`] on exit.
#[derive(Debug, Default)]
struct RunProgress {
    processed_events: u64,
    processed_pages: u64,
    failures: u64,
    last_committed_cursor: Option<Cursor>,
    exhausted_by_max_pages: bool,
}

impl RunProgress {
    fn to_result(&self, metrics: MetricsSnapshot) -> RunResult {
        RunResult {
            processed_events: self.processed_events,
            processed_pages: self.processed_pages,
            failures: self.failures,
            last_committed_cursor: self.last_committed_cursor.clone(),
            exhausted_by_max_pages: self.exhausted_by_max_pages,
            metrics,
        }
    }
}

/// Drives one source/handler pair. Never runs two pages concurrently:
/// pages are fetched and drained strictly in sequence, and events within
/// a page are handled strictly in arrival order.
pub struct Engine {
    source: Arc<dyn EventSource>,
    handler: Arc<dyn EventHandler>,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
    options: EngineOptions,
    metrics: MetricsCollector,
}

impl Engine {
    pub fn new(source: Arc<dyn EventSource>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            source,
            handler,
            dead_letter: None,
            options: EngineOptions::default(),
            metrics: MetricsCollector::new(),
        }
    }

    pub fn with_dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = Some(sink);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Supply an external collector; the engine otherwise creates its own.
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    /// Pull pages from the last committed cursor until end-of-stream,
    /// the page budget, or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] on configuration errors, source protocol
    /// violations, source I/O failures, and exhausted handler retries
    /// when `continue_on_error` is disabled. The failure carries the
    /// partial [`RunResult`] accumulated before the abort; the last
    /// successfully committed cursor is intact, so at worst the aborted
    /// page is redelivered on the next run.
    pub async fn run(&mut self) -> Result<RunResult, RunFailure> {
        let mut progress = RunProgress::default();

        if let Err(err) = self.options.validate() {
            return Err(self.fail(err, &progress));
        }

        let mut cursor = match self.source.get_cursor().await {
            Ok(cursor) => cursor,
            Err(err) => {
                return Err(self.fail(
                    EngineError::Source {
                        operation: "get_cursor",
                        source: err,
                    },
                    &progress,
                ))
            }
        };

        tracing::info!(
            resume_cursor = cursor.as_ref().map(Cursor::as_str),
            continue_on_error = self.options.continue_on_error,
            max_pages = self.options.max_pages_per_run,
            "Starting ingestion run"
        );

        loop {
            if let Some(max_pages) = self.options.max_pages_per_run {
                if progress.processed_pages >= max_pages {
                    progress.exhausted_by_max_pages = true;
                    tracing::info!(max_pages, "Page budget exhausted, stopping run");
                    break;
                }
            }

            let page = match self.source.fetch_page(cursor.as_ref()).await {
                Ok(page) => page,
                Err(err) => {
                    return Err(self.fail(
                        EngineError::Source {
                            operation: "fetch_page",
                            source: err,
                        },
                        &progress,
                    ))
                }
            };

            if page.nodes.is_empty() {
                tracing::info!("Empty page, end of stream");
                break;
            }

            // Contract violation by the source, never retried.
            let Some(end_cursor) = page.end_cursor.clone() else {
                return Err(self.fail(
                    EngineError::Protocol(format!(
                        "page with {} events has no end cursor",
                        page.nodes.len()
                    )),
                    &progress,
                ));
            };

            for event in &page.nodes {
                let started = Instant::now();
                let handler = Arc::clone(&self.handler);
                let outcome = with_retry(
                    &self.options.retry,
                    |attempt, err| {
                        tracing::warn!(
                            event_id = event.id.as_str(),
                            attempt,
                            error = %err,
                            "Handler failed, will retry"
                        );
                    },
                    || handler.handle(event),
                )
                .await;
                self.metrics
                    .record_timing(started.elapsed().as_secs_f64() * 1000.0);

                match outcome {
                    Ok(()) => {
                        self.metrics.increment("events_processed");
                        progress.processed_events += 1;
                    }
                    Err(RetryError::InvalidPolicy(msg)) => {
                        return Err(
                            self.fail(EngineError::InvalidConfiguration(msg), &progress)
                        );
                    }
                    Err(RetryError::Exhausted { attempts, last }) => {
                        self.metrics.increment("events_failed");
                        progress.failures += 1;
                        tracing::error!(
                            event_id = event.id.as_str(),
                            attempts,
                            error = %last,
                            "Retry budget exhausted"
                        );

                        let record = DeadLetterRecord {
                            event: event.clone(),
                            error: last.to_string(),
                            attempt_count: self.options.retry.retries,
                            timestamp: Utc::now(),
                        };
                        if let Some(sink) = &self.dead_letter {
                            // A dead-letter failure must never mask the
                            // original handler failure.
                            if let Err(sink_err) = sink.send(&record).await {
                                self.metrics.increment("dead_letter_failed");
                                tracing::error!(
                                    event_id = event.id.as_str(),
                                    error = %sink_err,
                                    "Dead-letter delivery failed"
                                );
                            }
                        }

                        if !self.options.continue_on_error {
                            // The page's cursor is not committed; events
                            // already handled in this page are redelivered
                            // on the next run.
                            return Err(self.fail(
                                EngineError::HandlerExhausted {
                                    event_id: event.id.clone(),
                                    attempts,
                                    source: last,
                                },
                                &progress,
                            ));
                        }
                    }
                }
            }

            if let Err(err) = self.source.commit_cursor(&end_cursor).await {
                return Err(self.fail(
                    EngineError::Source {
                        operation: "commit_cursor",
                        source: err,
                    },
                    &progress,
                ));
            }
            self.metrics.increment("cursor_commits");
            tracing::debug!(cursor = end_cursor.as_str(), "Cursor committed");

            progress.last_committed_cursor = Some(end_cursor.clone());
            progress.processed_pages += 1;
            cursor = Some(end_cursor);

            if !page.has_next_page {
                break;
            }
        }

        let result = progress.to_result(self.metrics.snapshot());
        tracing::info!(
            processed_events = result.processed_events,
            processed_pages = result.processed_pages,
            failures = result.failures,
            exhausted_by_max_pages = result.exhausted_by_max_pages,
            "Ingestion run complete"
        );
        Ok(result)
    }

    fn fail(&self, error: EngineError, progress: &RunProgress) -> RunFailure {
        tracing::error!(error = %error, "Ingestion run aborted");
        RunFailure {
            error,
            partial: progress.to_result(self.metrics.snapshot()),
        }
    }
}
