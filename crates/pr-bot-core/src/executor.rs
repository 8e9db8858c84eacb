//! Sequential plugin chain execution.

use crate::builder::BuildPair;
use crate::error::{BotError, Result};
use crate::plugin::{Plugin, PluginResults};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs plugins one after another against a fixed build pair.
pub struct PluginChainExecutor;

impl PluginChainExecutor {
    /// Run every plugin in order and collect results by name.
    ///
    /// - A plugin without a name fails the chain before any plugin runs.
    /// - The first plugin error stops the chain; later plugins never run and
    ///   earlier results are dropped.
    /// - A repeated name overwrites the earlier result.
    pub async fn run(plugins: &[Box<dyn Plugin>], builds: &BuildPair) -> Result<PluginResults> {
        let names = plugins
            .iter()
            .map(|plugin| {
                plugin
                    .name()
                    .filter(|name| !name.trim().is_empty())
                    .ok_or(BotError::MissingPluginName)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(count = plugins.len(), "Running plugins");

        let mut results = PluginResults::new();
        for (plugin, name) in plugins.iter().zip(names) {
            info!(plugin = %name, "Running plugin");
            let start = Instant::now();

            let result = plugin
                .run(builds)
                .await
                .map_err(|e| BotError::PluginExecution {
                    plugin: name.to_string(),
                    message: format!("{e:#}"),
                })?;

            debug!(
                plugin = %name,
                duration_ms = start.elapsed().as_millis() as u64,
                fail_pr = result.fail_pr,
                "Plugin finished"
            );

            if results.insert(name, result).is_some() {
                warn!(plugin = %name, "Duplicate plugin name, earlier result overwritten");
            }
        }

        Ok(results)
    }
}
