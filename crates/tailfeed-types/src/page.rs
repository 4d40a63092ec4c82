//! A bounded, ordered batch of events plus pagination metadata.

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::event::Event;

/// One source fetch: an ordered batch of events and where to resume.
///
/// Invariant: a non-empty `nodes` requires a non-null `end_cursor`. A
/// page violating this is a protocol error, fatal to the run that
/// observes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub nodes: Vec<Event>,
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
}

impl Page {
    /// The natural end-of-stream page.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            end_cursor: None,
            has_next_page: false,
        }
    }
}
