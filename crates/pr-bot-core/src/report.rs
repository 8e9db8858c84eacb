//! Local vs. remote reporting of plugin results.

use crate::config::Config;
use crate::env::EnvironmentProbe;
use crate::error::{BotError, Result};
use crate::hosting::{CommitState, HostingClient};
use crate::plugin::PluginResults;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const NO_LOG_PLACEHOLDER: &str = "This plugin provided no log output.";
pub const NO_MARKDOWN_PLACEHOLDER: &str = "This plugin provided no markdown output.";

/// Composite PR comment plus the aggregate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub comment: String,
    pub fail_pr: bool,
}

impl AggregatedReport {
    /// One `### name` section per result, in result order. The PR fails if
    /// any plugin asked for it.
    pub fn from_results(results: &PluginResults) -> Self {
        let mut comment = String::new();
        let mut fail_pr = false;
        for (name, result) in results.iter() {
            let markdown = result
                .markdown_log
                .as_deref()
                .unwrap_or(NO_MARKDOWN_PLACEHOLDER);
            comment.push_str(&format!("### {name}\n\n{markdown}\n\n"));
            fail_pr |= result.fail_pr;
        }
        Self { comment, fail_pr }
    }

    pub fn state(&self) -> CommitState {
        CommitState::from_fail_pr(self.fail_pr)
    }
}

/// Console rendering used outside CI pull-request builds.
pub fn render_debug(results: &PluginResults) -> String {
    let mut out = String::from("Results from plugins\n");
    for (name, result) in results.iter() {
        out.push_str(&format!("  {name}\n"));
        match result.pretty_log.as_deref() {
            Some(log) => {
                out.push_str(log);
                if !log.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str("    ");
                out.push_str(NO_LOG_PLACEHOLDER);
                out.push('\n');
            }
        }
    }
    out
}

/// What the decision did with the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Not a CI pull-request build; nothing left the process.
    Local { rendered: String },

    /// Comment and commit status were posted.
    Remote {
        report: AggregatedReport,
        state: CommitState,
    },
}

impl ReportOutcome {
    pub fn is_remote(&self) -> bool {
        matches!(self, ReportOutcome::Remote { .. })
    }
}

pub struct ReportDecision;

impl ReportDecision {
    pub fn is_remote(env: &dyn EnvironmentProbe) -> bool {
        env.is_ci() && env.is_pull_request()
    }

    /// Report locally, or post a comment and commit status on the pull request.
    ///
    /// Deleting earlier bot comments is best-effort; every other hosting
    /// failure is returned.
    pub async fn report(
        config: &Config,
        env: &dyn EnvironmentProbe,
        hosting: &dyn HostingClient,
        results: &PluginResults,
    ) -> Result<ReportOutcome> {
        if !Self::is_remote(env) {
            debug!(
                is_ci = env.is_ci(),
                is_pull_request = env.is_pull_request(),
                "Not a CI pull request build, reporting locally"
            );
            return Ok(ReportOutcome::Local {
                rendered: render_debug(results),
            });
        }

        let number = env
            .pull_request_number()
            .ok_or(BotError::IncompletePullRequestContext("a pull request number"))?;
        let sha = env
            .head_commit_sha()
            .ok_or(BotError::IncompletePullRequestContext("a head commit sha"))?;

        let report = AggregatedReport::from_results(results);
        let state = report.state();

        if let Some(bot_name) = config.bot_username.as_deref() {
            match hosting.delete_previous_issue_comments(number, bot_name).await {
                Ok(deleted) => debug!(pr = number, deleted, "Removed earlier bot comments"),
                Err(err) => warn!(
                    pr = number,
                    error = %err,
                    "Unable to delete earlier bot comments"
                ),
            }
        }

        hosting.post_issue_comment(number, &report.comment).await?;
        hosting.post_state(&sha, state).await?;

        info!(pr = number, sha = %sha, state = %state, "Reported results to the pull request");
        Ok(ReportOutcome::Remote { report, state })
    }
}
