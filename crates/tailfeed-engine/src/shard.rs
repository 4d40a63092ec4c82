//! Deterministic, hash-based partitioning helpers.
//!
//! A logical partition key maps onto one of several physical backing
//! discussions via a content hash, and each discussion gets a stable
//! checkpoint-variable name and concurrency-group label. The variable
//! name format must stay byte-for-byte stable: existing checkpoints are
//! addressed by it.

use sha2::{Digest, Sha256};

use crate::errors::EngineError;

/// Map `key` onto `[0, shard_count)` by reducing the first byte of its
/// SHA-256 digest. Stable across calls and process restarts.
pub fn shard_for_key(key: &str, shard_count: u32) -> Result<u32, EngineError> {
    if shard_count == 0 {
        return Err(EngineError::InvalidArgument(
            "shard count must be positive".into(),
        ));
    }
    let digest = Sha256::digest(key.as_bytes());
    Ok(u32::from(digest[0]) % shard_count)
}

/// Pick the backing discussion for `key` from a caller-supplied list.
pub fn select_shard_discussion(key: &str, discussion_numbers: &[u64]) -> Result<u64, EngineError> {
    if discussion_numbers.is_empty() {
        return Err(EngineError::InvalidArgument(
            "discussion list must not be empty".into(),
        ));
    }
    let index = shard_for_key(key, discussion_numbers.len() as u32)?;
    Ok(discussion_numbers[index as usize])
}

/// Canonical checkpoint-storage key: `"<PREFIX>_<discussion>_CURSOR"`.
///
/// The prefix is trimmed, uppercased, and any character outside
/// `[A-Z0-9_]` replaced with `_`; an empty result falls back to
/// `DISCUSSION`.
pub fn repo_variable_name(prefix: &str, discussion_number: u64) -> String {
    let normalized: String = prefix
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let prefix = if normalized.is_empty() {
        "DISCUSSION"
    } else {
        normalized.as_str()
    };
    format!("{prefix}_{discussion_number}_CURSOR")
}

/// Label for external mutual-exclusion scheduling of one stream. The
/// engine itself performs no locking.
pub fn discussion_concurrency_group(discussion_number: u64) -> String {
    format!("discussion-{discussion_number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_is_stable_known_vectors() {
        // sha256("a") starts with 0xca = 202
        assert_eq!(shard_for_key("a", 16).unwrap(), 202 % 16);
        // sha256("") starts with 0xe3 = 227
        assert_eq!(shard_for_key("", 4).unwrap(), 227 % 4);
    }

    #[test]
    fn shard_rejects_zero_count() {
        assert!(matches!(
            shard_for_key("any", 0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn select_discussion_indexes_by_shard() {
        let discussions = [101, 102, 103];
        let picked = select_shard_discussion("a", &discussions).unwrap();
        assert_eq!(picked, discussions[(202 % 3) as usize]);
    }

    #[test]
    fn select_discussion_rejects_empty_list() {
        assert!(select_shard_discussion("a", &[]).is_err());
    }

    #[test]
    fn variable_name_normalizes_prefix() {
        assert_eq!(repo_variable_name("discussion", 7), "DISCUSSION_7_CURSOR");
        assert_eq!(
            repo_variable_name("  prompt rating ", 12),
            "PROMPT_RATING_12_CURSOR"
        );
        assert_eq!(repo_variable_name("abc-123", 1), "ABC_123_1_CURSOR");
        assert_eq!(repo_variable_name("", 9), "DISCUSSION_9_CURSOR");
        assert_eq!(repo_variable_name("   ", 9), "DISCUSSION_9_CURSOR");
    }

    #[test]
    fn concurrency_group_format() {
        assert_eq!(discussion_concurrency_group(42), "discussion-42");
    }
}
