//! Capability contracts the engine is driven through.
//!
//! [`EventSource`], [`EventHandler`], and [`DeadLetterSink`] are the
//! seams between the engine and its collaborators. Adapters (GitHub
//! Discussions, in-memory test doubles, synthetic generators) implement
//! them polymorphically; the engine only ever sees trait objects.

use anyhow::Result;
use async_trait::async_trait;

use tailfeed_types::{Cursor, DeadLetterRecord, Event, Page};

/// A paginated, cursor-addressable event feed.
///
/// Implementations own cursor durability; the engine treats cursors as
/// opaque. Must be `Send + Sync` for use behind `Arc<dyn EventSource>`.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Read the last committed cursor.
    ///
    /// Returns `Ok(None)` when no checkpoint exists yet ("start from
    /// the beginning").
    async fn get_cursor(&self) -> Result<Option<Cursor>>;

    /// Fetch the page of events strictly after `cursor`.
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page>;

    /// Durably record that everything up to and including `cursor` has
    /// been handled.
    async fn commit_cursor(&self, cursor: &Cursor) -> Result<()>;
}

/// Consumer of individual events.
///
/// Handlers must be idempotent or dedupe on `event.id`: an aborted page
/// is redelivered in full on the next run.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<()>;
}

/// Side channel for events that exhausted their retry budget.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, record: &DeadLetterRecord) -> Result<()>;
}
