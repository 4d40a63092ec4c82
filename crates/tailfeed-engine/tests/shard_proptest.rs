//! Property tests for the hash-based partitioning helpers.

use proptest::prelude::*;

use tailfeed_engine::shard::{repo_variable_name, select_shard_discussion, shard_for_key};

proptest! {
    #[test]
    fn shard_is_within_range(key in ".*", count in 1u32..64) {
        let shard = shard_for_key(&key, count).unwrap();
        prop_assert!(shard < count);
    }

    #[test]
    fn shard_is_deterministic(key in ".*", count in 1u32..64) {
        prop_assert_eq!(
            shard_for_key(&key, count).unwrap(),
            shard_for_key(&key, count).unwrap()
        );
    }

    #[test]
    fn selected_discussion_is_from_the_list(
        key in ".*",
        discussions in proptest::collection::vec(1u64..10_000, 1..16)
    ) {
        let picked = select_shard_discussion(&key, &discussions).unwrap();
        prop_assert!(discussions.contains(&picked));
    }

    #[test]
    fn variable_name_charset_is_stable(prefix in ".*", number in 0u64..100_000) {
        let name = repo_variable_name(&prefix, number);
        prop_assert!(name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
        let expected_suffix = format!("_{}_CURSOR", number);
        prop_assert!(name.ends_with(&expected_suffix));
    }
}
