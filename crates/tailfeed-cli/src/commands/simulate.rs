//! `tailfeed simulate` — synthetic comment traffic against a discussion.

use anyhow::{Context, Result};

use tailfeed_engine::simulator::{simulate_traffic, TrafficOptions};
use tailfeed_github::{GithubClient, RepoRef};

pub async fn execute(
    repo: &str,
    discussion: u64,
    rate: f64,
    duration: u64,
    burst: u32,
) -> Result<()> {
    let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN is not set")?;
    let client = GithubClient::new(token)?;
    let repo = RepoRef::parse(repo)?;

    let discussion_id = client
        .discussion_node_id(&repo, discussion)
        .await?
        .with_context(|| format!("discussion {repo}#{discussion} not found"))?;

    let options = TrafficOptions {
        rate_per_second: rate,
        duration_seconds: duration,
        burst_size: burst,
        ..TrafficOptions::new(discussion_id)
    };
    let summary = simulate_traffic(&client, &options).await?;

    println!(
        "sent {} steady + {} burst comments ({} failures)",
        summary.steady_sent, summary.burst_sent, summary.send_failures
    );
    Ok(())
}
