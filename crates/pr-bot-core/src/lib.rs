//! PR Bot - before/after build comparison for pull requests
//!
//! Provides the pipeline behind the `pr-bot` binary:
//! - Loads the bot configuration and reads CI environment variables
//! - Clones and builds the base branch and the pull request head
//! - Runs the configured plugins against both builds
//! - Reports locally or as a PR comment plus commit status

pub mod bot;
pub mod builder;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod hosting;
pub mod plugin;
pub mod report;
pub mod runner;
pub mod step;
pub mod telemetry;

// Re-export key types
pub use bot::{PrBot, RunOutcome};
pub use builder::{BuildPair, DualBuildBuilder};
pub use config::{Config, ConfigLoader, PluginConfig, PluginKind, RepoDetails};
pub use env::{CiProvider, EnvVars, EnvironmentContext, EnvironmentProbe};
pub use error::{BotError, HostingError, Result};
pub use executor::PluginChainExecutor;
pub use hosting::{CommitState, GitHubClient, GitHubConfig, HostingClient, RepoInfo};
pub use plugin::{Plugin, PluginResult, PluginResults};
pub use report::{AggregatedReport, ReportDecision, ReportOutcome};
pub use runner::{CommandOutput, CommandRunner, Invocation, ShellCommandRunner};
pub use telemetry::init_tracing;
