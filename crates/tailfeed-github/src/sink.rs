//! Dead-letter delivery onto a dedicated discussion.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;

use tailfeed_engine::DeadLetterSink;
use tailfeed_types::DeadLetterRecord;

use crate::client::{GithubClient, RepoRef};

/// Render one record as a comment body: a short header plus the full
/// record as JSON in a fenced code block.
fn format_dead_letter_body(record: &DeadLetterRecord) -> Result<String> {
    let payload = serde_json::to_string_pretty(record)
        .context("Failed to serialize dead-letter record")?;
    Ok(format!(
        "### Dead-lettered event `{}`\n\nFailed after {} attempts: {}\n\n```json\n{}\n```\n",
        record.event.id, record.attempt_count, record.error, payload
    ))
}

/// Posts dead-letter records as comments on a separate, dedicated
/// discussion. The discussion node id is resolved once per instance.
pub struct DiscussionDeadLetterSink {
    client: Arc<GithubClient>,
    repo: RepoRef,
    discussion_number: u64,
    discussion_id: Mutex<Option<String>>,
}

impl DiscussionDeadLetterSink {
    pub fn new(client: Arc<GithubClient>, repo: RepoRef, discussion_number: u64) -> Self {
        Self {
            client,
            repo,
            discussion_number,
            discussion_id: Mutex::new(None),
        }
    }

    async fn resolve_discussion_id(&self) -> Result<String> {
        let cached = self
            .discussion_id
            .lock()
            .map_err(|_| anyhow::anyhow!("discussion id mutex poisoned"))?
            .clone();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = self
            .client
            .discussion_node_id(&self.repo, self.discussion_number)
            .await?
            .with_context(|| {
                format!(
                    "dead-letter discussion {}#{} not found",
                    self.repo, self.discussion_number
                )
            })?;

        *self
            .discussion_id
            .lock()
            .map_err(|_| anyhow::anyhow!("discussion id mutex poisoned"))? = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl DeadLetterSink for DiscussionDeadLetterSink {
    async fn send(&self, record: &DeadLetterRecord) -> Result<()> {
        let discussion_id = self.resolve_discussion_id().await?;
        let body = format_dead_letter_body(record)?;
        let comment_id = self
            .client
            .add_discussion_comment(&discussion_id, &body)
            .await?;
        tracing::info!(
            event_id = record.event.id.as_str(),
            comment_id = comment_id.as_str(),
            "Dead-letter record delivered"
        );
        Ok(())
    }
}
