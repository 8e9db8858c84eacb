//! Subprocess execution.
//!
//! Clones, checkouts, builds and command plugins all go through the
//! [`CommandRunner`] trait so tests can substitute a scripted runner.

use crate::error::{BotError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// A single subprocess to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Step label used in logs and errors (e.g. `git_clone`).
    pub step: String,

    pub program: String,

    pub args: Vec<String>,

    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(step: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            step: step.into(),
            program: program.into(),
            args,
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(step: impl Into<String>, script: &str) -> Self {
        Self::new(step, "sh", vec!["-c".to_string(), script.to_string()])
    }

    pub fn with_cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line as a single string, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Step label of the invocation.
    pub step: String,

    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,

    pub success: bool,
}

impl CommandOutput {
    /// Whether the process exited with code 0.
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Trimmed stdout and stderr joined by a newline, skipping empty streams.
    pub fn combined_output(&self) -> String {
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Launches subprocesses and waits for them to finish.
///
/// A non-zero exit is reported through `CommandOutput`, not as an error;
/// `Err` means the process could not be launched at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs invocations as real child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let start = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        debug!(step = %invocation.step, command = %invocation.command_line(), "Spawning");

        let output = command.output().await.map_err(|source| BotError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(CommandOutput {
            step: invocation.step.clone(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
