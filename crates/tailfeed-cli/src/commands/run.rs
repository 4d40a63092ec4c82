//! `tailfeed run` — drive one ingestion run against a discussion.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use tailfeed_engine::shard::discussion_concurrency_group;
use tailfeed_engine::{Engine, EngineOptions, EventHandler, RetryPolicy};
use tailfeed_github::{DiscussionDeadLetterSink, DiscussionSource, GithubClient, RepoRef};
use tailfeed_types::Event;

pub struct RunParams {
    pub repo: String,
    pub discussion: u64,
    pub prefix: String,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub retry_backoff_factor: f64,
    pub continue_on_error: bool,
    pub max_pages: Option<u64>,
    pub dead_letter_discussion: Option<u64>,
}

/// Prints each ingested event as one JSON line on stdout.
struct JsonLineHandler;

#[async_trait]
impl EventHandler for JsonLineHandler {
    async fn handle(&self, event: &Event) -> Result<()> {
        let line = serde_json::to_string(event).context("Failed to serialize event")?;
        println!("{line}");
        Ok(())
    }
}

pub async fn execute(params: RunParams) -> Result<()> {
    let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN is not set")?;
    let client = Arc::new(GithubClient::new(token)?);
    let repo = RepoRef::parse(&params.repo)?;

    let source = Arc::new(DiscussionSource::new(
        Arc::clone(&client),
        repo.clone(),
        params.discussion,
        &params.prefix,
    ));
    tracing::info!(
        repo = %repo,
        discussion = params.discussion,
        variable = source.variable_name(),
        concurrency_group = discussion_concurrency_group(params.discussion).as_str(),
        "Resolved checkpoint storage"
    );

    let mut engine = Engine::new(source, Arc::new(JsonLineHandler)).with_options(EngineOptions {
        retry: RetryPolicy {
            retries: params.retry_count,
            initial_delay_ms: params.retry_delay_ms,
            backoff_factor: params.retry_backoff_factor,
        },
        continue_on_error: params.continue_on_error,
        max_pages_per_run: params.max_pages,
    });
    if let Some(number) = params.dead_letter_discussion {
        engine = engine.with_dead_letter(Arc::new(DiscussionDeadLetterSink::new(
            client, repo, number,
        )));
    }

    match engine.run().await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(failure) => {
            // The partial result still tells the operator how far the
            // run got before the abort.
            eprintln!("{}", serde_json::to_string_pretty(&failure.partial)?);
            Err(failure.into())
        }
    }
}
