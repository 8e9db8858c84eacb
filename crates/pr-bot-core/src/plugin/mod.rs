//! Plugin contract and the result map the chain produces.

mod command;
mod size;

pub use command::{CommandPlugin, AFTER_PATH_VAR, BEFORE_PATH_VAR};
pub use size::SizePlugin;

use crate::builder::BuildPair;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output of one plugin run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Human-readable log for local runs.
    #[serde(default)]
    pub pretty_log: Option<String>,

    /// Markdown section for the pull request comment.
    #[serde(default)]
    pub markdown_log: Option<String>,

    /// Whether this plugin fails the pull request.
    #[serde(default)]
    pub fail_pr: bool,
}

/// An analysis step comparing the "before" and "after" builds.
///
/// Plugins run one at a time and may read or write either checkout while
/// they hold their turn.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Reporting key; `None` (or blank) aborts the chain before anything runs.
    fn name(&self) -> Option<&str>;

    async fn run(&self, builds: &BuildPair) -> anyhow::Result<PluginResult>;
}

#[async_trait]
impl<P: Plugin + ?Sized> Plugin for Arc<P> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    async fn run(&self, builds: &BuildPair) -> anyhow::Result<PluginResult> {
        (**self).run(builds).await
    }
}

/// Name-keyed plugin results in first-insertion order.
///
/// Inserting an existing name replaces the result but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginResults {
    entries: Vec<(String, PluginResult)>,
}

impl PluginResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` under `name`, returning the replaced result if any.
    pub fn insert(&mut self, name: impl Into<String>, result: PluginResult) -> Option<PluginResult> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, result)),
            None => {
                self.entries.push((name, result));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PluginResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PluginResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(n, _)| n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(markdown: &str) -> PluginResult {
        PluginResult {
            markdown_log: Some(markdown.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut results = PluginResults::new();
        results.insert("size-check", result("ok"));
        results.insert("lint", result("2 errors"));
        assert_eq!(results.names(), vec!["size-check", "lint"]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_duplicate_name_overwrites_in_place() {
        let mut results = PluginResults::new();
        results.insert("a", result("first"));
        results.insert("b", result("middle"));
        let replaced = results.insert("a", result("second"));

        assert_eq!(replaced, Some(result("first")));
        assert_eq!(results.names(), vec!["a", "b"]);
        assert_eq!(
            results.get("a").unwrap().markdown_log.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_plugin_result_defaults() {
        let parsed: PluginResult = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, PluginResult::default());
        assert!(!parsed.fail_pr);
    }
}
