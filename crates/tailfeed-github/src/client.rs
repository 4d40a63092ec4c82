//! Low-level GitHub GraphQL/REST client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use tailfeed_engine::simulator::CommentSender;

const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const DEFAULT_REST_URL: &str = "https://api.github.com";

const ADD_COMMENT_MUTATION: &str = r#"
mutation($discussionId: ID!, $body: String!) {
  addDiscussionComment(input: {discussionId: $discussionId, body: $body}) {
    comment { id }
  }
}"#;

const DISCUSSION_ID_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    discussion(number: $number) { id }
  }
}"#;

/// `owner/name` pair addressing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `"owner/name"` slug.
    pub fn parse(slug: &str) -> Result<Self> {
        match slug.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => anyhow::bail!("repository must be in owner/name form, got {slug:?}"),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Authenticated client for the GraphQL endpoint and the repository
/// variables REST endpoints.
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    graphql_url: String,
    rest_url: String,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("tailfeed")
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            token: token.into(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            rest_url: DEFAULT_REST_URL.to_string(),
        })
    }

    /// Point at a non-default API host (GitHub Enterprise, test server).
    pub fn with_endpoints(
        mut self,
        graphql_url: impl Into<String>,
        rest_url: impl Into<String>,
    ) -> Self {
        self.graphql_url = graphql_url.into();
        self.rest_url = rest_url.into();
        self
    }

    /// Execute one GraphQL request, surfacing the `errors` array of a
    /// 200 response as a failure.
    pub async fn graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(&self.graphql_url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .context("GraphQL request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("GraphQL request failed with status: {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse GraphQL response")?;

        if let Some(errors) = body
            .get("errors")
            .and_then(|e| e.as_array())
            .filter(|e| !e.is_empty())
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            anyhow::bail!("GraphQL errors: {}", messages.join("; "));
        }

        Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Read a repository variable. `Ok(None)` when the variable does
    /// not exist.
    pub async fn get_repo_variable(&self, repo: &RepoRef, name: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct Variable {
            value: String,
        }

        let url = format!(
            "{}/repos/{}/{}/actions/variables/{name}",
            self.rest_url, repo.owner, repo.name
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to read repository variable {name}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!(
                "Reading repository variable {name} failed with status: {}",
                response.status()
            );
        }

        let variable: Variable = response
            .json()
            .await
            .with_context(|| format!("Failed to parse repository variable {name}"))?;
        Ok(Some(variable.value))
    }

    /// Write a repository variable, creating it when it does not exist.
    pub async fn set_repo_variable(&self, repo: &RepoRef, name: &str, value: &str) -> Result<()> {
        let payload = serde_json::json!({ "name": name, "value": value });
        let url = format!(
            "{}/repos/{}/{}/actions/variables/{name}",
            self.rest_url, repo.owner, repo.name
        );
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to update repository variable {name}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // First write against a fresh repository.
            let create_url = format!(
                "{}/repos/{}/{}/actions/variables",
                self.rest_url, repo.owner, repo.name
            );
            let response = self
                .http
                .post(&create_url)
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json")
                .json(&payload)
                .send()
                .await
                .with_context(|| format!("Failed to create repository variable {name}"))?;
            if !response.status().is_success() {
                anyhow::bail!(
                    "Creating repository variable {name} failed with status: {}",
                    response.status()
                );
            }
            return Ok(());
        }

        if !response.status().is_success() {
            anyhow::bail!(
                "Updating repository variable {name} failed with status: {}",
                response.status()
            );
        }
        Ok(())
    }

    /// Resolve a discussion number to its GraphQL node id. `Ok(None)`
    /// when the discussion does not exist.
    pub async fn discussion_node_id(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<String>> {
        let data = self
            .graphql(
                DISCUSSION_ID_QUERY,
                serde_json::json!({
                    "owner": repo.owner,
                    "name": repo.name,
                    "number": number,
                }),
            )
            .await?;
        Ok(data["repository"]["discussion"]["id"]
            .as_str()
            .map(str::to_string))
    }

    /// Post a comment on a discussion, returning the new comment's id.
    pub async fn add_discussion_comment(
        &self,
        discussion_id: &str,
        body: &str,
    ) -> Result<String> {
        let data = self
            .graphql(
                ADD_COMMENT_MUTATION,
                serde_json::json!({ "discussionId": discussion_id, "body": body }),
            )
            .await?;
        data["addDiscussionComment"]["comment"]["id"]
            .as_str()
            .map(str::to_string)
            .context("addDiscussionComment response missing comment id")
    }
}

#[async_trait]
impl CommentSender for GithubClient {
    async fn send_comment(&self, discussion_id: &str, body: &str) -> Result<()> {
        self.add_discussion_comment(discussion_id, body).await?;
        Ok(())
    }
}
