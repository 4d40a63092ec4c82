//! Dead-letter record: a permanently-failed event diverted to a side
//! channel instead of blocking the main stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Record of an event that exhausted its retry budget.
///
/// Created exactly once per exhausted event; `attempt_count` is the
/// configured retry budget, `error` the message of the last failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    pub event: Event,
    pub error: String,
    pub attempt_count: u32,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Author;

    #[test]
    fn dead_letter_record_roundtrip() {
        let record = DeadLetterRecord {
            event: Event {
                id: "DC_2".into(),
                body: "boom".into(),
                created_at: "2025-06-01T12:00:00Z".parse().unwrap(),
                author: Some(Author { login: "octocat".into() }),
            },
            error: "handler timed out".into(),
            attempt_count: 3,
            timestamp: "2025-06-01T12:00:05Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: DeadLetterRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
