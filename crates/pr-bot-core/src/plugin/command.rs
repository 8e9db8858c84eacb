use super::{Plugin, PluginResult};
use crate::builder::BuildPair;
use crate::config::CommandPluginConfig;
use crate::runner::{CommandRunner, Invocation};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Exported to command plugins: path of the "before" checkout.
pub const BEFORE_PATH_VAR: &str = "PR_BOT_BEFORE_PATH";
/// Exported to command plugins: path of the "after" checkout.
pub const AFTER_PATH_VAR: &str = "PR_BOT_AFTER_PATH";

/// Runs a shell command in the "after" checkout and reports its output.
pub struct CommandPlugin {
    name: Option<String>,
    config: CommandPluginConfig,
    runner: Arc<dyn CommandRunner>,
}

impl CommandPlugin {
    pub fn new(
        name: Option<String>,
        config: CommandPluginConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            name,
            config,
            runner,
        }
    }
}

/// Backtick fence longer than any backtick run inside `text`.
fn code_fence(text: &str) -> String {
    let longest = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn run(&self, builds: &BuildPair) -> anyhow::Result<PluginResult> {
        let invocation = Invocation::shell("plugin_command", &self.config.command)
            .with_cwd(&builds.after_path)
            .with_env(BEFORE_PATH_VAR, builds.before_path.to_string_lossy())
            .with_env(AFTER_PATH_VAR, builds.after_path.to_string_lossy());

        let output = self.runner.run(&invocation).await?;
        debug!(
            command = %self.config.command,
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "Command plugin finished"
        );

        let log = output.combined_output();
        let status_line = format!(
            "`{}` exited with code {}.",
            self.config.command, output.exit_code
        );

        let pretty_log = if log.is_empty() {
            status_line.replace('`', "")
        } else {
            log.clone()
        };
        let markdown_log = if log.is_empty() {
            status_line
        } else {
            let fence = code_fence(&log);
            format!("{status_line}\n\n{fence}\n{log}\n{fence}")
        };

        Ok(PluginResult {
            pretty_log: Some(pretty_log),
            markdown_log: Some(markdown_log),
            fail_pr: !output.passed() && self.config.fail_on_error,
        })
    }
}
