//! Configuration file loading.
//!
//! The configuration unit is a TOML (default) or JSON file. Loading it
//! deserializes the file; no schema validation happens here beyond what
//! `serde` needs to build the types. Plugin names are checked later by the
//! plugin chain executor.

use crate::error::{BotError, Result};
use crate::plugin::{CommandPlugin, Plugin, SizePlugin};
use crate::runner::CommandRunner;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "pr-bot.toml";

/// Commit status context used when the configuration does not set one.
pub const DEFAULT_STATUS_CONTEXT: &str = "pr-bot";

/// Repository identity on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDetails {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RepoDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Options for the `command` plugin kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPluginConfig {
    /// Shell command run in the "after" checkout.
    pub command: String,

    /// Whether a non-zero exit should fail the pull request.
    #[serde(default = "default_true")]
    pub fail_on_error: bool,
}

/// Options for the `size` plugin kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizePluginConfig {
    /// Paths relative to the checkout root, files or directories.
    pub paths: Vec<String>,

    /// Growth above this percentage fails the pull request.
    #[serde(default)]
    pub max_growth_percent: Option<f64>,
}

/// Plugin implementations selectable from the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginKind {
    Command(CommandPluginConfig),
    Size(SizePluginConfig),
}

/// One `[[plugins]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Reporting key. Required, but only enforced when the chain runs.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub kind: PluginKind,
}

/// Bot configuration, loaded once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fallback repo identity when the CI environment does not provide one.
    #[serde(default)]
    pub repo_details: Option<RepoDetails>,

    /// Plugins, run in this order.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    /// Replaces the default `npm install && npm run build`.
    #[serde(default)]
    pub build_command: Option<String>,

    /// Branch checked out in the "before" clone instead of the default branch.
    #[serde(default)]
    pub override_base_branch: Option<String>,

    /// Login of the bot account; its earlier PR comments are removed.
    #[serde(default)]
    pub bot_username: Option<String>,

    /// Root for ephemeral build directories.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Commit status context label.
    #[serde(default)]
    pub status_context: Option<String>,
}

impl Config {
    /// Parse a TOML configuration document.
    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Root directory for the "before"/"after" clones.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pr-bot"))
    }

    pub fn status_context(&self) -> &str {
        self.status_context
            .as_deref()
            .unwrap_or(DEFAULT_STATUS_CONTEXT)
    }

    /// Instantiate the configured plugins, preserving order.
    pub fn build_plugins(&self, runner: Arc<dyn CommandRunner>) -> Vec<Box<dyn Plugin>> {
        self.plugins
            .iter()
            .map(|entry| -> Box<dyn Plugin> {
                match &entry.kind {
                    PluginKind::Command(options) => Box::new(CommandPlugin::new(
                        entry.name.clone(),
                        options.clone(),
                        runner.clone(),
                    )),
                    PluginKind::Size(options) => {
                        Box::new(SizePlugin::new(entry.name.clone(), options.clone()))
                    }
                }
            })
            .collect()
    }
}

fn default_true() -> bool {
    true
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Locates and loads the configuration file.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the configuration path, defaulting to `pr-bot.toml` in the
    /// current directory.
    pub fn resolve(path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir()
                .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Load the configuration at `path`.
    ///
    /// Fails with `ConfigNotFound` when the path does not exist and with
    /// `ConfigLoad` for any read or parse problem.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(BotError::ConfigNotFound(path.to_path_buf()));
        }

        let load_err = |message: String| BotError::ConfigLoad {
            path: path.to_path_buf(),
            message,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let format = ConfigFormat::from_path(path);
        let config = match format {
            ConfigFormat::Toml => Config::from_toml_str(&raw).map_err(|e| load_err(e.to_string())),
            ConfigFormat::Json => Config::from_json_str(&raw).map_err(|e| load_err(e.to_string())),
        }?;

        debug!(
            path = %path.display(),
            format = ?format,
            plugins = config.plugins.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}
