//! Hosting platform (code review) collaborator.

mod github;

pub use github::{GitHubClient, GitHubConfig, DEFAULT_API_URL};

use crate::error::HostingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository metadata needed to clone it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub clone_url: String,
}

/// Commit status posted for the head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Failure,
}

impl CommitState {
    pub fn from_fail_pr(fail_pr: bool) -> Self {
        if fail_pr {
            CommitState::Failure
        } else {
            CommitState::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Success => "success",
            CommitState::Failure => "failure",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue, comment and status operations on one repository.
#[async_trait]
pub trait HostingClient: Send + Sync {
    async fn repo_details(&self) -> Result<RepoInfo, HostingError>;

    /// Delete comments on pull request `number` authored by `bot_name`.
    /// Returns how many were deleted.
    async fn delete_previous_issue_comments(
        &self,
        number: u64,
        bot_name: &str,
    ) -> Result<usize, HostingError>;

    async fn post_issue_comment(&self, number: u64, comment: &str) -> Result<(), HostingError>;

    async fn post_state(&self, sha: &str, state: CommitState) -> Result<(), HostingError>;
}

#[async_trait]
impl<H: HostingClient + ?Sized> HostingClient for std::sync::Arc<H> {
    async fn repo_details(&self) -> Result<RepoInfo, HostingError> {
        (**self).repo_details().await
    }

    async fn delete_previous_issue_comments(
        &self,
        number: u64,
        bot_name: &str,
    ) -> Result<usize, HostingError> {
        (**self).delete_previous_issue_comments(number, bot_name).await
    }

    async fn post_issue_comment(&self, number: u64, comment: &str) -> Result<(), HostingError> {
        (**self).post_issue_comment(number, comment).await
    }

    async fn post_state(&self, sha: &str, state: CommitState) -> Result<(), HostingError> {
        (**self).post_state(sha, state).await
    }
}
