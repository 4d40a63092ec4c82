//! Shared model types for the tailfeed ingestion pipeline.
//!
//! This crate is dependency-light on purpose: engine, adapters, and the
//! CLI all consume these types without pulling in runtime machinery.

pub mod cursor;
pub mod dead_letter;
pub mod event;
pub mod metric;
pub mod page;

pub use cursor::Cursor;
pub use dead_letter::DeadLetterRecord;
pub use event::{Author, Event};
pub use metric::MetricsSnapshot;
pub use page::Page;
