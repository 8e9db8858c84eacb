//! Integration tests for the full bot run with in-memory collaborators.

use pr_bot_core::fakes::{
    run_order, HostingCall, MemoryHostingClient, RunLog, ScriptedCommandRunner, StaticPlugin,
};
use pr_bot_core::{
    BotError, CommitState, Config, EnvironmentContext, HostingClient, Plugin, PluginResult,
    PrBot, ReportOutcome,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config_in(work: &TempDir) -> Config {
    Config {
        work_dir: Some(work.path().to_path_buf()),
        bot_username: Some("pr-bot".to_string()),
        ..Default::default()
    }
}

fn pr_env() -> EnvironmentContext {
    EnvironmentContext::pull_request("octo", "widgets", "abc123", 42)
}

fn connect_to(
    hosting: &Arc<MemoryHostingClient>,
) -> impl FnOnce(&pr_bot_core::RepoDetails) -> pr_bot_core::Result<Box<dyn HostingClient>> {
    let hosting = hosting.clone();
    move |_: &pr_bot_core::RepoDetails| Ok(Box::new(hosting) as Box<dyn HostingClient>)
}

fn size_and_lint(log: &RunLog) -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(
            StaticPlugin::new(
                "size-check",
                PluginResult {
                    pretty_log: Some("bundle unchanged".to_string()),
                    markdown_log: Some("ok".to_string()),
                    fail_pr: false,
                },
            )
            .with_log(log.clone()),
        ),
        Box::new(
            StaticPlugin::new(
                "lint",
                PluginResult {
                    pretty_log: None,
                    markdown_log: Some("2 errors".to_string()),
                    fail_pr: true,
                },
            )
            .with_log(log.clone()),
        ),
    ]
}

/// Test: CI pull request build posts one comment and a failing status
#[tokio::test]
async fn test_pull_request_run_reports_remotely() {
    let work = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedCommandRunner::new());
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();

    let bot = PrBot::new(config_in(&work), Box::new(pr_env()), runner.clone())
        .with_plugins(size_and_lint(&log));
    let outcome = bot.run(connect_to(&hosting)).await.expect("run failed");

    assert_eq!(run_order(&log), vec!["size-check", "lint"]);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.builds.before_path.starts_with(work.path()));
    assert!(outcome.builds.after_path.starts_with(work.path()));

    match &outcome.report {
        ReportOutcome::Remote { report, state } => {
            assert!(report.fail_pr);
            assert_eq!(*state, CommitState::Failure);
        }
        other => panic!("expected remote report, got {other:?}"),
    }

    assert_eq!(
        hosting.calls(),
        vec![
            HostingCall::RepoDetails,
            HostingCall::DeletePreviousComments {
                number: 42,
                bot_name: "pr-bot".to_string(),
            },
            HostingCall::PostComment {
                number: 42,
                comment: "### size-check\n\nok\n\n### lint\n\n2 errors\n\n".to_string(),
            },
            HostingCall::PostState {
                sha: "abc123".to_string(),
                state: CommitState::Failure,
            },
        ]
    );
    assert_eq!(runner.count("git_clone"), 2);
    assert_eq!(runner.count("build"), 2);
}

/// Test: all plugins passing yields a success status
#[tokio::test]
async fn test_all_passing_posts_success() {
    let work = tempfile::tempdir().unwrap();
    let hosting = Arc::new(MemoryHostingClient::default());
    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(StaticPlugin::new("a", PluginResult::default())),
        Box::new(StaticPlugin::new("b", PluginResult::default())),
    ];

    let bot = PrBot::new(
        config_in(&work),
        Box::new(pr_env()),
        Arc::new(ScriptedCommandRunner::new()),
    )
    .with_plugins(plugins);
    bot.run(connect_to(&hosting)).await.unwrap();

    assert_eq!(
        hosting.write_calls().last(),
        Some(&HostingCall::PostState {
            sha: "abc123".to_string(),
            state: CommitState::Success,
        })
    );
}

/// Test: local runs never write to the hosting platform
#[tokio::test]
async fn test_local_run_renders_results() {
    let work = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedCommandRunner::new());
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();
    let env = EnvironmentContext {
        repo_owner: Some("octo".to_string()),
        repo_name: Some("widgets".to_string()),
        ..Default::default()
    };

    let bot = PrBot::new(config_in(&work), Box::new(env), runner.clone())
        .with_plugins(size_and_lint(&log))
        .with_current_dir(cwd.path());
    let outcome = bot.run(connect_to(&hosting)).await.unwrap();

    assert_eq!(outcome.builds.after_path, cwd.path());
    assert_eq!(runner.count("git_clone"), 1);
    assert!(hosting.write_calls().is_empty());

    match outcome.report {
        ReportOutcome::Local { rendered } => {
            assert!(rendered.starts_with("Results from plugins\n"));
            assert!(rendered.contains("  size-check\nbundle unchanged\n"));
            assert!(rendered.contains("This plugin provided no log output."));
        }
        other => panic!("expected local report, got {other:?}"),
    }
}

/// Test: a plugin error stops the chain and nothing is reported
#[tokio::test]
async fn test_plugin_error_aborts_run() {
    let work = tempfile::tempdir().unwrap();
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();
    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(StaticPlugin::new("first", PluginResult::default()).with_log(log.clone())),
        Box::new(StaticPlugin::failing("broken", "could not parse stats").with_log(log.clone())),
        Box::new(StaticPlugin::new("last", PluginResult::default()).with_log(log.clone())),
    ];

    let bot = PrBot::new(
        config_in(&work),
        Box::new(pr_env()),
        Arc::new(ScriptedCommandRunner::new()),
    )
    .with_plugins(plugins);
    let err = bot.run(connect_to(&hosting)).await.unwrap_err();

    assert_eq!(run_order(&log), vec!["first", "broken"]);
    assert!(err.to_string().contains("'broken'"));
    assert!(err.to_string().contains("could not parse stats"));
    assert!(hosting.write_calls().is_empty());
}

/// Test: a plugin without a name fails before any plugin or build output is used
#[tokio::test]
async fn test_unnamed_plugin_runs_nothing() {
    let work = tempfile::tempdir().unwrap();
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();
    let plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(StaticPlugin::new("named", PluginResult::default()).with_log(log.clone())),
        Box::new(StaticPlugin::unnamed(PluginResult::default()).with_log(log.clone())),
    ];

    let bot = PrBot::new(
        config_in(&work),
        Box::new(pr_env()),
        Arc::new(ScriptedCommandRunner::new()),
    )
    .with_plugins(plugins);
    let err = bot.run(connect_to(&hosting)).await.unwrap_err();

    assert!(matches!(err, BotError::MissingPluginName));
    assert!(run_order(&log).is_empty());
    assert!(hosting.write_calls().is_empty());
}

/// Test: a failing "after" build aborts before plugins run
#[tokio::test]
async fn test_after_build_failure_skips_plugins() {
    let work = tempfile::tempdir().unwrap();
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();
    let runner = Arc::new(ScriptedCommandRunner::new().fail_on("build", 1, 1));

    let bot = PrBot::new(config_in(&work), Box::new(pr_env()), runner)
        .with_plugins(size_and_lint(&log));
    let err = bot.run(connect_to(&hosting)).await.unwrap_err();

    assert!(matches!(err, BotError::AfterBuildFailure { .. }));
    assert!(run_order(&log).is_empty());
    assert!(hosting.write_calls().is_empty());
}

/// Test: a failing "before" build still produces a report
#[tokio::test]
async fn test_before_build_failure_is_tolerated() {
    let work = tempfile::tempdir().unwrap();
    let hosting = Arc::new(MemoryHostingClient::default());
    let log = RunLog::default();
    let runner = Arc::new(ScriptedCommandRunner::new().fail_on("build", 0, 1));

    let bot = PrBot::new(config_in(&work), Box::new(pr_env()), runner)
        .with_plugins(size_and_lint(&log));
    let outcome = bot.run(connect_to(&hosting)).await.unwrap();

    assert_eq!(run_order(&log), vec!["size-check", "lint"]);
    assert!(outcome.report.is_remote());
}

fn write(dir: &Path, rel: &str, bytes: usize) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![b'x'; bytes]).unwrap();
}

/// Test: plugins built from a TOML configuration run end to end
#[tokio::test]
async fn test_configured_plugins_run() {
    let work = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    write(cwd.path(), "dist/app.js", 2048);

    let raw = format!(
        r#"
work_dir = "{}"

[repo_details]
owner = "octo"
repo = "widgets"

[[plugins]]
name = "size-check"
kind = "size"
paths = ["dist"]

[[plugins]]
name = "lint"
kind = "command"
command = "npm run lint"
"#,
        work.path().display()
    );
    let config = Config::from_toml_str(&raw).unwrap();

    let runner = Arc::new(ScriptedCommandRunner::new().respond_with(
        "plugin_command",
        1,
        "2 errors",
    ));
    let hosting = Arc::new(MemoryHostingClient::default());

    let bot = PrBot::new(config, Box::new(EnvironmentContext::default()), runner.clone())
        .with_current_dir(cwd.path());
    let outcome = bot.run(connect_to(&hosting)).await.unwrap();

    assert_eq!(outcome.results.names(), vec!["size-check", "lint"]);

    let size = outcome.results.get("size-check").unwrap();
    assert!(!size.fail_pr);
    assert!(size.pretty_log.as_deref().unwrap().contains("(new)"));

    let lint = outcome.results.get("lint").unwrap();
    assert!(lint.fail_pr);
    assert!(lint.pretty_log.as_deref().unwrap().contains("2 errors"));

    let plugin_runs: Vec<_> = runner
        .invocations()
        .into_iter()
        .filter(|inv| inv.step == "plugin_command")
        .collect();
    assert_eq!(plugin_runs.len(), 1);
    assert_eq!(plugin_runs[0].cwd.as_deref(), Some(cwd.path()));
}
