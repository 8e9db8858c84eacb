//! In-memory fakes for the pipeline's collaborators (testing only)
//!
//! Provides `ScriptedCommandRunner`, `MemoryHostingClient`, and `StaticPlugin`
//! so the whole pipeline can run without git, a shell, or the network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::builder::BuildPair;
use crate::error::{BotError, HostingError, Result};
use crate::hosting::{CommitState, HostingClient, RepoInfo};
use crate::plugin::{Plugin, PluginResult};
use crate::runner::{CommandOutput, CommandRunner, Invocation};

// ---------------------------------------------------------------------------
// ScriptedCommandRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Exit { code: i32, stdout: String },
    SpawnError,
}

#[derive(Debug, Clone)]
struct Rule {
    step: String,
    /// Zero-based occurrence of `step`; `None` matches every occurrence.
    occurrence: Option<usize>,
    reply: Reply,
}

/// Records invocations and answers them from a script.
///
/// Unscripted invocations succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedCommandRunner {
    rules: Vec<Rule>,
    seen: Mutex<Vec<Invocation>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `exit_code` on the `occurrence`-th (zero-based) run of `step`.
    pub fn fail_on(mut self, step: &str, occurrence: usize, exit_code: i32) -> Self {
        self.rules.push(Rule {
            step: step.to_string(),
            occurrence: Some(occurrence),
            reply: Reply::Exit {
                code: exit_code,
                stdout: String::new(),
            },
        });
        self
    }

    /// Answer every run of `step` with `exit_code` and `stdout`.
    pub fn respond_with(mut self, step: &str, exit_code: i32, stdout: &str) -> Self {
        self.rules.push(Rule {
            step: step.to_string(),
            occurrence: None,
            reply: Reply::Exit {
                code: exit_code,
                stdout: stdout.to_string(),
            },
        });
        self
    }

    /// Fail every run of `step` as if the program could not be launched.
    pub fn spawn_error_on(mut self, step: &str) -> Self {
        self.rules.push(Rule {
            step: step.to_string(),
            occurrence: None,
            reply: Reply::SpawnError,
        });
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }

    /// Number of recorded runs of `step`.
    pub fn count(&self, step: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.step == step)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let occurrence = {
            let mut seen = self.seen.lock().unwrap();
            let n = seen.iter().filter(|inv| inv.step == invocation.step).count();
            seen.push(invocation.clone());
            n
        };

        let reply = self
            .rules
            .iter()
            .find(|rule| {
                rule.step == invocation.step
                    && rule.occurrence.map_or(true, |n| n == occurrence)
            })
            .map(|rule| rule.reply.clone())
            .unwrap_or(Reply::Exit {
                code: 0,
                stdout: String::new(),
            });

        match reply {
            Reply::SpawnError => Err(BotError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn error"),
            }),
            Reply::Exit { code, stdout } => Ok(CommandOutput {
                step: invocation.step.clone(),
                exit_code: code,
                stdout,
                stderr: if code == 0 {
                    String::new()
                } else {
                    format!("{} failed", invocation.step)
                },
                duration_ms: 0,
                success: code == 0,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryHostingClient
// ---------------------------------------------------------------------------

/// A call received by [`MemoryHostingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingCall {
    RepoDetails,
    DeletePreviousComments { number: u64, bot_name: String },
    PostComment { number: u64, comment: String },
    PostState { sha: String, state: CommitState },
}

/// Hosting client that records calls instead of talking to a platform.
#[derive(Debug)]
pub struct MemoryHostingClient {
    clone_url: String,
    fail_deletes: bool,
    calls: Mutex<Vec<HostingCall>>,
}

impl Default for MemoryHostingClient {
    fn default() -> Self {
        Self::new("https://github.com/octo/widgets.git")
    }
}

impl MemoryHostingClient {
    pub fn new(clone_url: &str) -> Self {
        Self {
            clone_url: clone_url.to_string(),
            fail_deletes: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make comment deletion fail.
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn calls(&self) -> Vec<HostingCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than `repo_details`, i.e. ones that write to the platform.
    pub fn write_calls(&self) -> Vec<HostingCall> {
        self.calls()
            .into_iter()
            .filter(|c| *c != HostingCall::RepoDetails)
            .collect()
    }

    fn record(&self, call: HostingCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostingClient for MemoryHostingClient {
    async fn repo_details(&self) -> std::result::Result<RepoInfo, HostingError> {
        self.record(HostingCall::RepoDetails);
        Ok(RepoInfo {
            clone_url: self.clone_url.clone(),
        })
    }

    async fn delete_previous_issue_comments(
        &self,
        number: u64,
        bot_name: &str,
    ) -> std::result::Result<usize, HostingError> {
        self.record(HostingCall::DeletePreviousComments {
            number,
            bot_name: bot_name.to_string(),
        });
        if self.fail_deletes {
            return Err(HostingError::Http("connection reset".to_string()));
        }
        Ok(0)
    }

    async fn post_issue_comment(
        &self,
        number: u64,
        comment: &str,
    ) -> std::result::Result<(), HostingError> {
        self.record(HostingCall::PostComment {
            number,
            comment: comment.to_string(),
        });
        Ok(())
    }

    async fn post_state(
        &self,
        sha: &str,
        state: CommitState,
    ) -> std::result::Result<(), HostingError> {
        self.record(HostingCall::PostState {
            sha: sha.to_string(),
            state,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticPlugin
// ---------------------------------------------------------------------------

/// Shared log of plugin names in the order they ran.
pub type RunLog = Arc<Mutex<Vec<String>>>;

/// Plugin returning a fixed result (or error) and recording that it ran.
pub struct StaticPlugin {
    name: Option<String>,
    outcome: std::result::Result<PluginResult, String>,
    log: RunLog,
    seen: Mutex<Vec<BuildPair>>,
}

impl StaticPlugin {
    pub fn new(name: &str, result: PluginResult) -> Self {
        Self {
            name: Some(name.to_string()),
            outcome: Ok(result),
            log: RunLog::default(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            ..Self::new(name, PluginResult::default())
        }
    }

    pub fn unnamed(result: PluginResult) -> Self {
        Self {
            name: None,
            ..Self::new("", result)
        }
    }

    /// Append to `log` whenever this plugin runs.
    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = log;
        self
    }

    /// Build pairs this plugin was run against.
    pub fn seen(&self) -> Vec<BuildPair> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Plugin for StaticPlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn run(&self, builds: &BuildPair) -> anyhow::Result<PluginResult> {
        self.seen.lock().unwrap().push(builds.clone());
        self.log
            .lock()
            .unwrap()
            .push(self.name.clone().unwrap_or_default());
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

/// Collect the run log into a plain vector.
pub fn run_order(log: &RunLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

