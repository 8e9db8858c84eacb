//! GitHub REST client.

use super::{CommitState, HostingClient, RepoInfo};
use crate::config::{RepoDetails, DEFAULT_STATUS_CONTEXT};
use crate::error::HostingError;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const COMMENTS_PER_PAGE: usize = 100;

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API root, e.g. `https://api.github.com`.
    pub api_base_url: String,
    pub owner: String,
    pub repo: String,
    /// Personal access or installation token (optional for read-only use).
    pub token: Option<String>,
    /// Context label of posted commit statuses.
    pub status_context: String,
}

impl GitHubConfig {
    pub fn new(details: &RepoDetails) -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            owner: details.owner.clone(),
            repo: details.repo.clone(),
            token: None,
            status_context: DEFAULT_STATUS_CONTEXT.to_string(),
        }
    }

    /// Read `GITHUB_TOKEN` and `GITHUB_API_URL` from the process environment.
    pub fn from_env(details: &RepoDetails) -> Self {
        let mut config = Self::new(details);
        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        config.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        config
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.to_string();
        self
    }

    pub fn with_status_context(mut self, context: &str) -> Self {
        self.status_context = context.to_string();
        self
    }

    /// `{api}/repos/{owner}/{repo}{path}`
    pub fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }
}

#[derive(Debug, Deserialize)]
struct CommentAuthor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    id: u64,
    user: Option<CommentAuthor>,
}

/// Ids of the comments written by `bot_name`.
fn comments_by(comments: &[IssueComment], bot_name: &str) -> Vec<u64> {
    comments
        .iter()
        .filter(|c| c.user.as_ref().is_some_and(|u| u.login == bot_name))
        .map(|c| c.id)
        .collect()
}

/// [`HostingClient`] backed by the GitHub REST API.
pub struct GitHubClient {
    config: GitHubConfig,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, HostingError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pr-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send and turn non-2xx responses into `HostingError::Api`.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, HostingError> {
        let mut builder = self.request(method.clone(), url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        debug!(method = %method, url = %url, "GitHub request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| status.to_string());
        Err(HostingError::Api {
            method: method.to_string(),
            endpoint: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>, HostingError> {
        let mut comments = Vec::new();
        let mut page = 1;
        loop {
            let url = self.config.repo_url(&format!(
                "/issues/{number}/comments?per_page={COMMENTS_PER_PAGE}&page={page}"
            ));
            let batch: Vec<IssueComment> = self
                .send(Method::GET, &url, None)
                .await?
                .json()
                .await
                .map_err(|e| HostingError::InvalidResponse {
                    endpoint: url.clone(),
                    message: e.to_string(),
                })?;
            let last_page = batch.len() < COMMENTS_PER_PAGE;
            comments.extend(batch);
            if last_page {
                return Ok(comments);
            }
            page += 1;
        }
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    async fn repo_details(&self) -> Result<RepoInfo, HostingError> {
        let url = self.config.repo_url("");
        let response = self.send(Method::GET, &url, None).await?;
        response
            .json::<RepoInfo>()
            .await
            .map_err(|e| HostingError::InvalidResponse {
                endpoint: url,
                message: e.to_string(),
            })
    }

    async fn delete_previous_issue_comments(
        &self,
        number: u64,
        bot_name: &str,
    ) -> Result<usize, HostingError> {
        let comments = self.list_issue_comments(number).await?;
        let ids = comments_by(&comments, bot_name);
        for id in &ids {
            let url = self.config.repo_url(&format!("/issues/comments/{id}"));
            self.send(Method::DELETE, &url, None).await?;
        }
        info!(pr = number, bot = %bot_name, deleted = ids.len(), "Deleted previous bot comments");
        Ok(ids.len())
    }

    async fn post_issue_comment(&self, number: u64, comment: &str) -> Result<(), HostingError> {
        let url = self.config.repo_url(&format!("/issues/{number}/comments"));
        self.send(Method::POST, &url, Some(json!({ "body": comment })))
            .await?;
        info!(pr = number, "Posted pull request comment");
        Ok(())
    }

    async fn post_state(&self, sha: &str, state: CommitState) -> Result<(), HostingError> {
        let url = self.config.repo_url(&format!("/statuses/{sha}"));
        let description = match state {
            CommitState::Success => "All plugins passed",
            CommitState::Failure => "One or more plugins failed this pull request",
        };
        let body = json!({
            "state": state.as_str(),
            "context": self.config.status_context,
            "description": description,
        });
        self.send(Method::POST, &url, Some(body)).await?;
        info!(sha = %sha, state = %state, "Posted commit status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> RepoDetails {
        RepoDetails {
            owner: "octo".to_string(),
            repo: "widgets".to_string(),
        }
    }

    #[test]
    fn test_repo_url() {
        let config = GitHubConfig::new(&details());
        assert_eq!(config.repo_url(""), "https://api.github.com/repos/octo/widgets");
        assert_eq!(
            config.repo_url("/statuses/abc"),
            "https://api.github.com/repos/octo/widgets/statuses/abc"
        );
    }

    #[test]
    fn test_repo_url_trims_trailing_slash() {
        let config = GitHubConfig::new(&details()).with_api_base_url("https://ghe.example.com/api/v3/");
        assert_eq!(
            config.repo_url("/issues/3/comments"),
            "https://ghe.example.com/api/v3/repos/octo/widgets/issues/3/comments"
        );
    }

    #[test]
    fn test_config_builders() {
        let config = GitHubConfig::new(&details())
            .with_token("t0ken")
            .with_status_context("size-bot");
        assert_eq!(config.token.as_deref(), Some("t0ken"));
        assert_eq!(config.status_context, "size-bot");
    }

    #[test]
    fn test_comments_by_filters_on_login() {
        let comments: Vec<IssueComment> = serde_json::from_value(json!([
            { "id": 1, "user": { "login": "pr-bot" } },
            { "id": 2, "user": { "login": "human" } },
            { "id": 3, "user": null },
            { "id": 4, "user": { "login": "pr-bot" } }
        ]))
        .unwrap();
        assert_eq!(comments_by(&comments, "pr-bot"), vec![1, 4]);
        assert!(comments_by(&comments, "nobody").is_empty());
    }

    #[test]
    fn test_repo_info_parses_clone_url() {
        let info: RepoInfo = serde_json::from_value(json!({
            "id": 1,
            "clone_url": "https://github.com/octo/widgets.git",
            "default_branch": "main"
        }))
        .unwrap();
        assert_eq!(info.clone_url, "https://github.com/octo/widgets.git");
    }

    #[test]
    fn test_client_construction() {
        let client = GitHubClient::new(GitHubConfig::new(&details())).unwrap();
        assert_eq!(client.config().owner, "octo");
    }
}
