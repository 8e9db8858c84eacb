//! End-to-end run: resolve the repo, build both versions, run the plugin
//! chain, report.

use crate::builder::{BuildPair, DualBuildBuilder};
use crate::config::{Config, RepoDetails};
use crate::env::{EnvironmentContext, EnvironmentProbe};
use crate::error::{BotError, Result};
use crate::executor::PluginChainExecutor;
use crate::hosting::HostingClient;
use crate::plugin::{Plugin, PluginResults};
use crate::report::{ReportDecision, ReportOutcome};
use crate::runner::CommandRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub builds: BuildPair,
    pub results: PluginResults,
    pub report: ReportOutcome,
}

/// One bot invocation wired to its collaborators.
pub struct PrBot {
    config: Config,
    env: Box<dyn EnvironmentProbe>,
    runner: Arc<dyn CommandRunner>,
    plugins: Vec<Box<dyn Plugin>>,
    current_dir: PathBuf,
}

impl PrBot {
    /// Plugins are instantiated from `config`.
    pub fn new(config: Config, env: Box<dyn EnvironmentProbe>, runner: Arc<dyn CommandRunner>) -> Self {
        let plugins = config.build_plugins(runner.clone());
        Self {
            config,
            env,
            runner,
            plugins,
            current_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Replace the configured plugins.
    pub fn with_plugins(mut self, plugins: Vec<Box<dyn Plugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Directory used as "after" when the environment has no head commit.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = dir.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Repo identity from the environment, falling back to the configuration.
    pub fn resolve_repo_details(&self) -> Result<RepoDetails> {
        self.env
            .repo_details()
            .or_else(|| self.config.repo_details.clone())
            .ok_or(BotError::MissingRepoDetails)
    }

    /// Run the whole pipeline. `connect` builds the hosting client once the
    /// repo identity is known.
    pub async fn run<F>(&self, connect: F) -> Result<RunOutcome>
    where
        F: FnOnce(&RepoDetails) -> Result<Box<dyn HostingClient>>,
    {
        let repo = self.resolve_repo_details()?;
        let context = EnvironmentContext::capture(self.env.as_ref());
        info!(
            provider = self.env.provider(),
            repo = %repo,
            is_ci = context.is_ci,
            is_pull_request = context.is_pull_request,
            "Starting PR bot run"
        );
        debug!(
            branch = ?context.branch,
            sha = ?context.head_commit_sha,
            pr = ?context.pr_number,
            test_result = ?context.test_result,
            "Environment"
        );

        let hosting = connect(&repo)?;

        let builds = DualBuildBuilder::new(&self.config, self.runner.as_ref(), self.current_dir.clone())
            .build(self.env.as_ref(), hosting.as_ref())
            .await?;

        let results = PluginChainExecutor::run(&self.plugins, &builds).await?;

        let report =
            ReportDecision::report(&self.config, self.env.as_ref(), hosting.as_ref(), &results)
                .await?;

        Ok(RunOutcome {
            builds,
            results,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryHostingClient, ScriptedCommandRunner};

    fn bot(env: EnvironmentContext, config: Config) -> PrBot {
        PrBot::new(config, Box::new(env), Arc::new(ScriptedCommandRunner::new()))
    }

    #[test]
    fn test_repo_details_prefer_environment() {
        let config = Config {
            repo_details: Some(RepoDetails {
                owner: "config-owner".to_string(),
                repo: "config-repo".to_string(),
            }),
            ..Default::default()
        };
        let env = EnvironmentContext::pull_request("env-owner", "env-repo", "abc", 1);
        let details = bot(env, config).resolve_repo_details().unwrap();
        assert_eq!(details.to_string(), "env-owner/env-repo");
    }

    #[test]
    fn test_repo_details_fall_back_to_config() {
        let config = Config {
            repo_details: Some(RepoDetails {
                owner: "octo".to_string(),
                repo: "widgets".to_string(),
            }),
            ..Default::default()
        };
        let details = bot(EnvironmentContext::default(), config)
            .resolve_repo_details()
            .unwrap();
        assert_eq!(details.repo, "widgets");
    }

    #[tokio::test]
    async fn test_missing_repo_details_fails_before_connecting() {
        let bot = bot(EnvironmentContext::default(), Config::default());
        let mut connected = false;
        let err = bot
            .run(|_| {
                connected = true;
                Ok(Box::new(MemoryHostingClient::default()) as Box<dyn HostingClient>)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::MissingRepoDetails));
        assert!(!connected);
    }
}
