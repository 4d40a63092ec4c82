//! GitHub Discussions adapter: event source and dead-letter sink over
//! the GraphQL API, with checkpoint storage in repository variables.

pub mod client;
pub mod sink;
pub mod source;

pub use client::{GithubClient, RepoRef};
pub use sink::DiscussionDeadLetterSink;
pub use source::DiscussionSource;
