use super::{EnvVars, EnvironmentProbe};
use crate::config::RepoDetails;

/// Travis CI environment reader.
///
/// `TRAVIS_PULL_REQUEST` holds the PR number on pull request builds and the
/// literal `false` otherwise.
#[derive(Debug, Clone, Default)]
pub struct TravisEnv {
    vars: EnvVars,
}

impl TravisEnv {
    pub fn new(vars: EnvVars) -> Self {
        Self { vars }
    }

    pub fn from_process() -> Self {
        Self::new(EnvVars::from_process())
    }

    fn pull_request_var(&self) -> Option<&str> {
        self.vars
            .get("TRAVIS_PULL_REQUEST")
            .filter(|value| *value != "false")
    }
}

impl EnvironmentProbe for TravisEnv {
    fn provider(&self) -> &'static str {
        "travis"
    }

    fn is_ci(&self) -> bool {
        self.vars.is("TRAVIS", "true")
    }

    fn is_pull_request(&self) -> bool {
        self.pull_request_var().is_some()
    }

    fn repo_details(&self) -> Option<RepoDetails> {
        let (owner, repo) = self.vars.get("TRAVIS_REPO_SLUG")?.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(RepoDetails {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn branch(&self) -> Option<String> {
        self.vars.owned("TRAVIS_BRANCH")
    }

    fn head_commit_sha(&self) -> Option<String> {
        self.vars
            .owned("TRAVIS_PULL_REQUEST_SHA")
            .or_else(|| self.vars.owned("TRAVIS_COMMIT"))
    }

    fn pull_request_number(&self) -> Option<u64> {
        self.pull_request_var().and_then(|value| value.parse().ok())
    }

    fn is_successful_run(&self) -> Option<bool> {
        self.vars.get("TRAVIS_TEST_RESULT").map(|code| code == "0")
    }
}
