//! CI environment probing.
//!
//! The pipeline only talks to [`EnvironmentProbe`]. Each CI provider reads
//! its own variable names from an [`EnvVars`] snapshot, and the provider is
//! chosen once at startup through [`CiProvider`].

mod circleci;
mod travis;

pub use circleci::CircleCiEnv;
pub use travis::TravisEnv;

use crate::config::RepoDetails;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only view over the CI provider's context.
pub trait EnvironmentProbe: Send + Sync {
    /// Short provider label used in logs.
    fn provider(&self) -> &'static str;

    fn is_ci(&self) -> bool;

    fn is_pull_request(&self) -> bool;

    /// Owner and repo, only when both are present.
    fn repo_details(&self) -> Option<RepoDetails>;

    /// Target branch of the pull request, or the branch being built.
    fn branch(&self) -> Option<String>;

    fn head_commit_sha(&self) -> Option<String>;

    fn pull_request_number(&self) -> Option<u64>;

    /// Result of an earlier test step, when the provider exposes one.
    fn is_successful_run(&self) -> Option<bool>;
}

/// Snapshot of environment variables. Empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvVars(HashMap<String, String>);

impl EnvVars {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn is(&self, key: &str, expected: &str) -> bool {
        self.get(key) == Some(expected)
    }

    pub(crate) fn owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        EnvVars(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Supported CI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiProvider {
    CircleCi,
    Travis,
}

impl CiProvider {
    /// Pick the provider from the environment. CircleCI is the fallback.
    pub fn detect(vars: &EnvVars) -> Self {
        if vars.is("TRAVIS", "true") {
            CiProvider::Travis
        } else {
            CiProvider::CircleCi
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CiProvider::CircleCi => "circleci",
            CiProvider::Travis => "travis",
        }
    }

    /// Build the probe for this provider over `vars`.
    pub fn probe(self, vars: EnvVars) -> Box<dyn EnvironmentProbe> {
        match self {
            CiProvider::CircleCi => Box::new(CircleCiEnv::new(vars)),
            CiProvider::Travis => Box::new(TravisEnv::new(vars)),
        }
    }
}

/// Captured environment values.
///
/// Also implements [`EnvironmentProbe`], so a snapshot can stand in for a
/// live provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub is_ci: bool,
    pub is_pull_request: bool,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub branch: Option<String>,
    pub head_commit_sha: Option<String>,
    pub pr_number: Option<u64>,
    pub test_result: Option<bool>,
}

impl EnvironmentContext {
    pub fn capture(probe: &dyn EnvironmentProbe) -> Self {
        let details = probe.repo_details();
        Self {
            is_ci: probe.is_ci(),
            is_pull_request: probe.is_pull_request(),
            repo_owner: details.as_ref().map(|d| d.owner.clone()),
            repo_name: details.map(|d| d.repo),
            branch: probe.branch(),
            head_commit_sha: probe.head_commit_sha(),
            pr_number: probe.pull_request_number(),
            test_result: probe.is_successful_run(),
        }
    }

    /// Context of a CI pull-request build.
    pub fn pull_request(owner: &str, repo: &str, sha: &str, number: u64) -> Self {
        Self {
            is_ci: true,
            is_pull_request: true,
            repo_owner: Some(owner.to_string()),
            repo_name: Some(repo.to_string()),
            branch: None,
            head_commit_sha: Some(sha.to_string()),
            pr_number: Some(number),
            test_result: None,
        }
    }
}

impl EnvironmentProbe for EnvironmentContext {
    fn provider(&self) -> &'static str {
        "static"
    }

    fn is_ci(&self) -> bool {
        self.is_ci
    }

    fn is_pull_request(&self) -> bool {
        self.is_pull_request
    }

    fn repo_details(&self) -> Option<RepoDetails> {
        match (&self.repo_owner, &self.repo_name) {
            (Some(owner), Some(repo)) => Some(RepoDetails {
                owner: owner.clone(),
                repo: repo.clone(),
            }),
            _ => None,
        }
    }

    fn branch(&self) -> Option<String> {
        self.branch.clone()
    }

    fn head_commit_sha(&self) -> Option<String> {
        self.head_commit_sha.clone()
    }

    fn pull_request_number(&self) -> Option<u64> {
        self.pr_number
    }

    fn is_successful_run(&self) -> Option<bool> {
        self.test_result
    }
}
