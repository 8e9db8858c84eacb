//! "Before" and "after" checkout construction.

use crate::config::Config;
use crate::env::EnvironmentProbe;
use crate::error::{BotError, Result};
use crate::hosting::HostingClient;
use crate::runner::{CommandOutput, CommandRunner};
use crate::step::{BuildStep, DEFAULT_BUILD_COMMAND};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Paths of the two built snapshots handed to plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPair {
    /// Default (or overridden base) branch.
    pub before_path: PathBuf,

    /// Head commit, or the caller's working directory when no head commit
    /// is known.
    pub after_path: PathBuf,
}

/// Clones and builds the base branch and the head commit.
///
/// The "before" build may fail (the run continues with a possibly unbuilt
/// baseline); the "after" build must succeed. Ephemeral directories are
/// never removed here.
pub struct DualBuildBuilder<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    work_dir: PathBuf,
    current_dir: PathBuf,
}

impl<'a> DualBuildBuilder<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner, current_dir: PathBuf) -> Self {
        Self {
            config,
            runner,
            work_dir: config.work_dir(),
            current_dir,
        }
    }

    pub fn build_command(&self) -> &str {
        self.config
            .build_command
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_COMMAND)
    }

    pub async fn build(
        &self,
        env: &dyn EnvironmentProbe,
        hosting: &dyn HostingClient,
    ) -> Result<BuildPair> {
        let clone_url = hosting.repo_details().await?.clone_url;
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let before_path = self.ephemeral_dir().await?;
        info!(path = %before_path.display(), "Cloning default branch into \"before\"");
        self.run_required(BuildStep::Clone {
            url: clone_url.clone(),
            dest: before_path.clone(),
        })
        .await?;

        if let Some(branch) = &self.config.override_base_branch {
            info!(branch = %branch, "Checking out overridden base branch");
            self.run_required(BuildStep::Checkout {
                reference: branch.clone(),
                repo: before_path.clone(),
            })
            .await?;
        }

        let after_path = match env.head_commit_sha() {
            None => {
                warn!(
                    path = %self.current_dir.display(),
                    "No head commit in the environment, using the current directory as \"after\""
                );
                self.current_dir.clone()
            }
            Some(sha) => {
                let after_path = self.ephemeral_dir().await?;
                info!(path = %after_path.display(), sha = %sha, "Cloning head commit into \"after\"");
                self.run_required(BuildStep::Clone {
                    url: clone_url,
                    dest: after_path.clone(),
                })
                .await?;
                self.run_required(BuildStep::Checkout {
                    reference: sha,
                    repo: after_path.clone(),
                })
                .await?;
                after_path
            }
        };

        info!(command = %self.build_command(), "Building before and after versions");
        self.build_before(&before_path).await;
        self.build_after(&after_path).await?;

        Ok(BuildPair {
            before_path,
            after_path,
        })
    }

    async fn ephemeral_dir(&self) -> Result<PathBuf> {
        let path = self.work_dir.join(Uuid::new_v4().simple().to_string());
        tokio::fs::create_dir(&path).await?;
        Ok(path)
    }

    /// Clone/checkout steps: any failure aborts.
    async fn run_required(&self, step: BuildStep) -> Result<CommandOutput> {
        let output = self.runner.run(&step.invocation()).await?;
        if !output.passed() {
            return Err(BotError::CommandFailed {
                step: step.name().to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn build_step(&self, dir: &Path) -> BuildStep {
        BuildStep::Build {
            command: self.build_command().to_string(),
            dir: dir.to_path_buf(),
        }
    }

    /// Tolerant: a failed "before" build is logged and the run continues.
    async fn build_before(&self, dir: &Path) {
        let reason = match self.runner.run(&self.build_step(dir).invocation()).await {
            Ok(output) if output.passed() => return,
            Ok(output) => format!("exit code {}", output.exit_code),
            Err(err) => err.to_string(),
        };
        let err = BotError::BeforeBuildFailure {
            command: self.build_command().to_string(),
            reason,
        };
        warn!(error = %err, "Continuing with an unbuilt \"before\" version");
    }

    async fn build_after(&self, dir: &Path) -> Result<()> {
        let (exit_code, stderr) = match self.runner.run(&self.build_step(dir).invocation()).await {
            Ok(output) if output.passed() => return Ok(()),
            Ok(output) => (output.exit_code, output.stderr.trim().to_string()),
            Err(err) => (-1, err.to_string()),
        };
        let err = BotError::AfterBuildFailure {
            command: self.build_command().to_string(),
            exit_code,
            stderr,
        };
        error!(error = %err, "Build of the \"after\" version failed");
        Err(err)
    }
}
