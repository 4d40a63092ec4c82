//! Discussion comment feed as an [`EventSource`], checkpointed in a
//! repository variable.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use tailfeed_engine::shard::repo_variable_name;
use tailfeed_engine::EventSource;
use tailfeed_types::{Author, Cursor, Event, Page};

use crate::client::{GithubClient, RepoRef};

const PAGE_SIZE: i64 = 100;

const DISCUSSION_COMMENTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    discussion(number: $number) {
      id
      comments(first: $first, after: $after) {
        nodes {
          id
          body
          createdAt
          author { login }
        }
        pageInfo {
          endCursor
          hasNextPage
        }
      }
    }
  }
}"#;

#[derive(Deserialize)]
struct AuthorNode {
    login: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    id: String,
    body: String,
    created_at: DateTime<Utc>,
    author: Option<AuthorNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

/// Map one GraphQL response onto `(discussion id, page)`.
///
/// An absent discussion resolves to `None`, which the source treats as
/// an empty stream rather than an error.
fn parse_comments_page(data: &serde_json::Value) -> Result<Option<(String, Page)>> {
    let discussion = &data["repository"]["discussion"];
    if discussion.is_null() {
        return Ok(None);
    }

    let discussion_id = discussion["id"]
        .as_str()
        .context("discussion response missing id")?
        .to_string();

    let nodes: Vec<CommentNode> = serde_json::from_value(discussion["comments"]["nodes"].clone())
        .context("Failed to parse discussion comment nodes")?;
    let page_info: PageInfo = serde_json::from_value(discussion["comments"]["pageInfo"].clone())
        .context("Failed to parse discussion page info")?;

    let events = nodes
        .into_iter()
        .map(|node| Event {
            id: node.id,
            body: node.body,
            created_at: node.created_at,
            author: node.author.map(|a| Author { login: a.login }),
        })
        .collect();

    Ok(Some((
        discussion_id,
        Page {
            nodes: events,
            end_cursor: page_info.end_cursor.map(Cursor::from),
            has_next_page: page_info.has_next_page,
        },
    )))
}

/// One discussion's comment list, exposed as a paginated event feed.
///
/// The resolved discussion node id and the checkpoint value are memoized
/// per instance with a single-writer assumption; instances are not safe
/// to share across concurrent consumers of the same stream.
pub struct DiscussionSource {
    client: Arc<GithubClient>,
    repo: RepoRef,
    discussion_number: u64,
    variable_name: String,
    discussion_id: Mutex<Option<String>>,
    cursor_cache: Mutex<Option<Option<Cursor>>>,
}

impl DiscussionSource {
    pub fn new(
        client: Arc<GithubClient>,
        repo: RepoRef,
        discussion_number: u64,
        variable_prefix: &str,
    ) -> Self {
        Self {
            client,
            repo,
            discussion_number,
            variable_name: repo_variable_name(variable_prefix, discussion_number),
            discussion_id: Mutex::new(None),
            cursor_cache: Mutex::new(None),
        }
    }

    /// The repository variable this source checkpoints into.
    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }
}

#[async_trait]
impl EventSource for DiscussionSource {
    async fn get_cursor(&self) -> Result<Option<Cursor>> {
        let cached = self
            .cursor_cache
            .lock()
            .map_err(|_| anyhow::anyhow!("cursor cache mutex poisoned"))?
            .clone();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let value = self
            .client
            .get_repo_variable(&self.repo, &self.variable_name)
            .await?;
        let cursor = value.filter(|v| !v.is_empty()).map(Cursor::from);
        tracing::debug!(
            repo = %self.repo,
            variable = self.variable_name.as_str(),
            cursor = cursor.as_ref().map(Cursor::as_str),
            "Loaded checkpoint"
        );
        *self
            .cursor_cache
            .lock()
            .map_err(|_| anyhow::anyhow!("cursor cache mutex poisoned"))? = Some(cursor.clone());
        Ok(cursor)
    }

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page> {
        let variables = serde_json::json!({
            "owner": self.repo.owner,
            "name": self.repo.name,
            "number": self.discussion_number,
            "first": PAGE_SIZE,
            "after": cursor.map(Cursor::as_str),
        });
        let data = self
            .client
            .graphql(DISCUSSION_COMMENTS_QUERY, variables)
            .await?;

        match parse_comments_page(&data)? {
            Some((discussion_id, page)) => {
                let mut cached = self
                    .discussion_id
                    .lock()
                    .map_err(|_| anyhow::anyhow!("discussion id mutex poisoned"))?;
                if cached.is_none() {
                    *cached = Some(discussion_id);
                }
                Ok(page)
            }
            None => {
                tracing::warn!(
                    repo = %self.repo,
                    discussion = self.discussion_number,
                    "Discussion not found, treating as empty stream"
                );
                Ok(Page::empty())
            }
        }
    }

    async fn commit_cursor(&self, cursor: &Cursor) -> Result<()> {
        self.client
            .set_repo_variable(&self.repo, &self.variable_name, cursor.as_str())
            .await?;
        *self
            .cursor_cache
            .lock()
            .map_err(|_| anyhow::anyhow!("cursor cache mutex poisoned"))? =
            Some(Some(cursor.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_page() {
        let data = serde_json::json!({
            "repository": {
                "discussion": {
                    "id": "D_kwDOAbc123",
                    "comments": {
                        "nodes": [
                            {
                                "id": "DC_1",
                                "body": "first",
                                "createdAt": "2025-06-01T12:00:00Z",
                                "author": { "login": "octocat" }
                            },
                            {
                                "id": "DC_2",
                                "body": "second",
                                "createdAt": "2025-06-01T12:01:00Z",
                                "author": null
                            }
                        ],
                        "pageInfo": {
                            "endCursor": "Y3Vyc29y",
                            "hasNextPage": true
                        }
                    }
                }
            }
        });

        let (id, page) = parse_comments_page(&data).unwrap().unwrap();
        assert_eq!(id, "D_kwDOAbc123");
        assert_eq!(page.nodes.len(), 2);
        assert_eq!(page.nodes[0].id, "DC_1");
        assert_eq!(
            page.nodes[0].author.as_ref().unwrap().login,
            "octocat"
        );
        assert!(page.nodes[1].author.is_none());
        assert_eq!(page.end_cursor, Some(Cursor::from("Y3Vyc29y")));
        assert!(page.has_next_page);
    }

    #[test]
    fn parse_absent_discussion_as_none() {
        let data = serde_json::json!({ "repository": { "discussion": null } });
        assert!(parse_comments_page(&data).unwrap().is_none());
    }

    #[test]
    fn parse_exhausted_stream() {
        let data = serde_json::json!({
            "repository": {
                "discussion": {
                    "id": "D_1",
                    "comments": {
                        "nodes": [],
                        "pageInfo": { "endCursor": null, "hasNextPage": false }
                    }
                }
            }
        });
        let (_, page) = parse_comments_page(&data).unwrap().unwrap();
        assert!(page.nodes.is_empty());
        assert!(page.end_cursor.is_none());
        assert!(!page.has_next_page);
    }

    #[test]
    fn variable_name_uses_canonical_scheme() {
        let client = Arc::new(GithubClient::new("token").unwrap());
        let source = DiscussionSource::new(
            client,
            RepoRef::new("octo-org", "tailfeed"),
            42,
            "prompt rating",
        );
        assert_eq!(source.variable_name(), "PROMPT_RATING_42_CURSOR");
    }
}
