//! Event model: one immutable unit of input data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author attribution for an event, when the source provides one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
}

/// One immutable unit of input data (e.g., a discussion comment).
///
/// Identity is `id`; events are never mutated after fetch. Handlers must
/// be idempotent or dedupe on `id`, since an aborted page is redelivered
/// in full on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}
