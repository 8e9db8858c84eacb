//! Error taxonomy for the PR bot pipeline.

use std::path::PathBuf;

/// Errors returned by the hosting platform client.
#[derive(Debug, thiserror::Error)]
pub enum HostingError {
    #[error("{method} {endpoint} returned {status}: {message}")]
    Api {
        method: String,
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl From<reqwest::Error> for HostingError {
    fn from(err: reqwest::Error) -> Self {
        HostingError::Http(err.to_string())
    }
}

/// PR bot pipeline errors.
///
/// Every variant except `BeforeBuildFailure` aborts the run. The "before"
/// failure is only ever constructed to be logged.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("unable to find the config file: '{}'", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("a problem occurred loading the config file '{}': {message}", path.display())]
    ConfigLoad { path: PathBuf, message: String },

    #[error(
        "unable to get the GitHub repo details from the CI environment \
         variables or the configuration file"
    )]
    MissingRepoDetails,

    #[error("unable to run '{command}' in the \"before\" version: {reason}")]
    BeforeBuildFailure { command: String, reason: String },

    #[error("unable to run '{command}' in the \"after\" version (exit code {exit_code}): {stderr}")]
    AfterBuildFailure {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("one of the plugins has failed to define a name; a name is required for reporting")]
    MissingPluginName,

    #[error("the '{plugin}' plugin threw an error while running: '{message}'")]
    PluginExecution { plugin: String, message: String },

    #[error("{step} failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        step: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hosting platform error: {0}")]
    Hosting(#[from] HostingError),

    #[error("pull request build is missing {0}")]
    IncompletePullRequestContext(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PR bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_execution_error_names_plugin_and_message() {
        let err = BotError::PluginExecution {
            plugin: "lint".to_string(),
            message: "eslint not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("'lint'"));
        assert!(text.contains("eslint not found"));
    }

    #[test]
    fn test_config_not_found_shows_path() {
        let err = BotError::ConfigNotFound(PathBuf::from("/nowhere/pr-bot.toml"));
        assert!(err.to_string().contains("/nowhere/pr-bot.toml"));
    }

    #[test]
    fn test_hosting_error_converts() {
        let err: BotError = HostingError::Api {
            method: "POST".to_string(),
            endpoint: "/repos/o/r/statuses/abc".to_string(),
            status: 422,
            message: "Validation Failed".to_string(),
        }
        .into();
        assert!(matches!(err, BotError::Hosting(_)));
        assert!(err.to_string().contains("422"));
    }
}
