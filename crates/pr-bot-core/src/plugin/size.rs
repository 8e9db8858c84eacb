use super::{Plugin, PluginResult};
use crate::builder::BuildPair;
use crate::config::SizePluginConfig;
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;

/// Compares on-disk size of build outputs between "before" and "after".
pub struct SizePlugin {
    name: Option<String>,
    config: SizePluginConfig,
}

/// Size of one configured path in both checkouts.
#[derive(Debug, Clone, PartialEq)]
struct SizeDelta {
    path: String,
    /// `None` when the path did not exist before.
    before: Option<u64>,
    after: u64,
}

impl SizeDelta {
    /// Growth in percent; `None` when there is no non-zero baseline.
    fn growth_percent(&self) -> Option<f64> {
        match self.before {
            None => None,
            Some(0) if self.after == 0 => Some(0.0),
            Some(0) => None,
            Some(before) => Some((self.after as f64 - before as f64) / before as f64 * 100.0),
        }
    }

    fn exceeds(&self, max_growth_percent: Option<f64>) -> bool {
        match (max_growth_percent, self.growth_percent()) {
            (Some(max), Some(growth)) => growth > max,
            _ => false,
        }
    }

    fn change(&self) -> String {
        let diff = self.after as i64 - self.before.unwrap_or(0) as i64;
        let sign = if diff >= 0 { "+" } else { "-" };
        let bytes = format!("{sign}{}", format_bytes(diff.unsigned_abs()));
        match (self.before, self.growth_percent()) {
            (None, _) => format!("{bytes} (new)"),
            (Some(_), Some(pct)) => format!("{bytes} ({pct:+.2}%)"),
            (Some(_), None) => bytes,
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Total bytes under `path`, or `None` if it does not exist.
fn measure(path: &Path) -> std::io::Result<Option<u64>> {
    if !path.exists() {
        return Ok(None);
    }
    let metadata = std::fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(Some(metadata.len()));
    }
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        total += measure(&entry?.path())?.unwrap_or(0);
    }
    Ok(Some(total))
}

impl SizePlugin {
    pub fn new(name: Option<String>, config: SizePluginConfig) -> Self {
        Self { name, config }
    }

    /// Measure every configured path off the async runtime.
    async fn collect(&self, builds: &BuildPair) -> anyhow::Result<Vec<SizeDelta>> {
        let paths = self.config.paths.clone();
        let builds = builds.clone();
        tokio::task::spawn_blocking(move || collect_sizes(&paths, &builds))
            .await
            .context("size measurement task failed")?
    }
}

fn collect_sizes(paths: &[String], builds: &BuildPair) -> anyhow::Result<Vec<SizeDelta>> {
    paths
        .iter()
        .map(|rel| {
            let before = measure(&builds.before_path.join(rel))
                .with_context(|| format!("reading '{rel}' in the \"before\" build"))?;
            let after = measure(&builds.after_path.join(rel))
                .with_context(|| format!("reading '{rel}' in the \"after\" build"))?
                .with_context(|| format!("'{rel}' does not exist in the \"after\" build"))?;
            Ok(SizeDelta {
                path: rel.clone(),
                before,
                after,
            })
        })
        .collect()
}

#[async_trait]
impl Plugin for SizePlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn run(&self, builds: &BuildPair) -> anyhow::Result<PluginResult> {
        let deltas = self.collect(builds).await?;
        let max = self.config.max_growth_percent;

        let mut pretty = Vec::with_capacity(deltas.len());
        let mut markdown = String::from("| Path | Before | After | Change |\n|---|---|---|---|\n");
        for delta in &deltas {
            let flag = if delta.exceeds(max) { " ⚠" } else { "" };
            pretty.push(format!(
                "{}: {} -> {} {}{flag}",
                delta.path,
                format_bytes(delta.before.unwrap_or(0)),
                format_bytes(delta.after),
                delta.change()
            ));
            markdown.push_str(&format!(
                "| `{}` | {} | {} | {}{flag} |\n",
                delta.path,
                format_bytes(delta.before.unwrap_or(0)),
                format_bytes(delta.after),
                delta.change()
            ));
        }

        let fail_pr = deltas.iter().any(|d| d.exceeds(max));
        if let (true, Some(max)) = (fail_pr, max) {
            markdown.push_str(&format!("\nSize grew by more than {max}%.\n"));
        }

        Ok(PluginResult {
            pretty_log: Some(pretty.join("\n")),
            markdown_log: Some(markdown),
            fail_pr,
        })
    }
}
