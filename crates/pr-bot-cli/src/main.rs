//! PR Bot CLI
//!
//! Builds the pull request's base branch and head commit, runs the configured
//! plugins over both builds, then prints the results (local runs) or posts a
//! comment and commit status to GitHub (CI pull request builds).

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pr_bot_core::config::RepoDetails;
use pr_bot_core::telemetry::{init_tracing, level_for};
use pr_bot_core::{
    CiProvider, ConfigLoader, EnvVars, GitHubClient, GitHubConfig, HostingClient, PrBot,
    ReportOutcome, ShellCommandRunner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pr-bot")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare before/after builds of a pull request", long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON by extension); default ./pr-bot.toml
    #[arg(short, long, env = "PR_BOT_CONFIG")]
    config: Option<PathBuf>,

    /// CI provider whose environment variables are read
    #[arg(long, value_enum, default_value_t = ProviderArg::Auto)]
    provider: ProviderArg,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    Auto,
    Circleci,
    Travis,
}

impl ProviderArg {
    fn resolve(self, vars: &EnvVars) -> CiProvider {
        match self {
            ProviderArg::Auto => CiProvider::detect(vars),
            ProviderArg::Circleci => CiProvider::CircleCi,
            ProviderArg::Travis => CiProvider::Travis,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));
    if log_failure(run(cli).await) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Log a failed run once, with its full context chain. Returns whether the
/// run failed.
fn log_failure(result: Result<()>) -> bool {
    match result {
        Ok(()) => false,
        Err(err) => {
            error!(error = %format!("{err:#}"), "PR bot run failed");
            true
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = ConfigLoader::resolve(cli.config.as_deref());
    let config = ConfigLoader::load(&config_path).context("Failed to load configuration")?;

    let vars = EnvVars::from_process();
    let provider = cli.provider.resolve(&vars);
    info!(provider = provider.name(), config = %config_path.display(), "Starting");

    let status_context = config.status_context().to_string();
    let bot = PrBot::new(config, provider.probe(vars), Arc::new(ShellCommandRunner));

    let outcome = bot
        .run(|repo: &RepoDetails| {
            let github = GitHubConfig::from_env(repo).with_status_context(&status_context);
            Ok(Box::new(GitHubClient::new(github)?) as Box<dyn HostingClient>)
        })
        .await?;

    match outcome.report {
        ReportOutcome::Local { rendered } => print!("{rendered}"),
        ReportOutcome::Remote { state, .. } => {
            info!(state = %state, plugins = outcome.results.len(), "Posted results to GitHub");
        }
    }
    Ok(())
}
