use super::{EnvVars, EnvironmentProbe};
use crate::config::RepoDetails;

/// CircleCI environment reader.
#[derive(Debug, Clone, Default)]
pub struct CircleCiEnv {
    vars: EnvVars,
}

impl CircleCiEnv {
    pub fn new(vars: EnvVars) -> Self {
        Self { vars }
    }

    pub fn from_process() -> Self {
        Self::new(EnvVars::from_process())
    }
}

/// Number following `pull/` in a pull request URL.
fn number_from_pull_url(url: &str) -> Option<u64> {
    let (_, tail) = url.split_once("pull/")?;
    tail.split(|c: char| !c.is_ascii_digit())
        .next()
        .and_then(|digits| digits.parse().ok())
}

impl EnvironmentProbe for CircleCiEnv {
    fn provider(&self) -> &'static str {
        "circleci"
    }

    fn is_ci(&self) -> bool {
        self.vars.is("CI", "true")
    }

    fn is_pull_request(&self) -> bool {
        self.vars.get("CIRCLE_PULL_REQUEST").is_some()
            || self.vars.get("CI_PULL_REQUEST").is_some()
    }

    fn repo_details(&self) -> Option<RepoDetails> {
        Some(RepoDetails {
            owner: self.vars.owned("CIRCLE_PROJECT_USERNAME")?,
            repo: self.vars.owned("CIRCLE_PROJECT_REPONAME")?,
        })
    }

    fn branch(&self) -> Option<String> {
        self.vars.owned("CIRCLE_BRANCH")
    }

    fn head_commit_sha(&self) -> Option<String> {
        self.vars.owned("CIRCLE_SHA1")
    }

    fn pull_request_number(&self) -> Option<u64> {
        // CI_PULL_REQUEST is the deprecated name and may hold "pull_request"
        // instead of the URL.
        let from_url = ["CIRCLE_PULL_REQUEST", "CI_PULL_REQUEST"]
            .iter()
            .find_map(|key| self.vars.get(key).and_then(number_from_pull_url));
        if from_url.is_some() {
            return from_url;
        }
        self.vars
            .get("CIRCLE_PR_NUMBER")
            .filter(|value| *value != "false")
            .and_then(|value| value.parse().ok())
    }

    fn is_successful_run(&self) -> Option<bool> {
        self.vars.get("CIRCLE_TEST_RESULT").map(|code| code == "0")
    }
}
