//! `tailfeed shard` — deterministic key → discussion selection.

use anyhow::Result;

use tailfeed_engine::shard::{select_shard_discussion, shard_for_key};

pub fn execute(key: &str, discussions: &[u64]) -> Result<()> {
    let shard = shard_for_key(key, discussions.len() as u32)?;
    let discussion = select_shard_discussion(key, discussions)?;
    println!("key {key:?} -> shard {shard} -> discussion {discussion}");
    Ok(())
}
