//! `tailfeed vars` — checkpoint variable and concurrency group names.

use anyhow::Result;

use tailfeed_engine::shard::{discussion_concurrency_group, repo_variable_name};

pub fn execute(discussion: u64, prefix: &str) -> Result<()> {
    println!("cursor variable:   {}", repo_variable_name(prefix, discussion));
    println!(
        "concurrency group: {}",
        discussion_concurrency_group(discussion)
    );
    Ok(())
}
