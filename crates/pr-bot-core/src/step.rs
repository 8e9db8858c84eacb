//! Subprocess steps used to prepare the "before" and "after" checkouts.

use crate::runner::Invocation;
use std::path::PathBuf;

/// Build command used when the configuration does not provide one.
pub const DEFAULT_BUILD_COMMAND: &str = "npm install && npm run build";

/// One step of the dual build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// git clone <url> <dest>
    Clone { url: String, dest: PathBuf },

    /// git checkout <reference>, inside `repo`
    Checkout { reference: String, repo: PathBuf },

    /// sh -c <command>, inside `dir`
    Build { command: String, dir: PathBuf },
}

impl BuildStep {
    /// Step label used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            BuildStep::Clone { .. } => "git_clone",
            BuildStep::Checkout { .. } => "git_checkout",
            BuildStep::Build { .. } => "build",
        }
    }

    pub fn invocation(&self) -> Invocation {
        match self {
            BuildStep::Clone { url, dest } => Invocation::new(
                self.name(),
                "git",
                vec![
                    "clone".to_string(),
                    url.clone(),
                    dest.to_string_lossy().to_string(),
                ],
            ),
            BuildStep::Checkout { reference, repo } => Invocation::new(
                self.name(),
                "git",
                vec!["checkout".to_string(), reference.clone()],
            )
            .with_cwd(repo),
            BuildStep::Build { command, dir } => {
                Invocation::shell(self.name(), command).with_cwd(dir)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names() {
        let dir = PathBuf::from("/tmp/pr-bot/a");
        assert_eq!(
            BuildStep::Clone {
                url: "u".to_string(),
                dest: dir.clone()
            }
            .name(),
            "git_clone"
        );
        assert_eq!(
            BuildStep::Checkout {
                reference: "main".to_string(),
                repo: dir.clone()
            }
            .name(),
            "git_checkout"
        );
        assert_eq!(
            BuildStep::Build {
                command: "make".to_string(),
                dir
            }
            .name(),
            "build"
        );
    }

    #[test]
    fn test_clone_invocation() {
        let inv = BuildStep::Clone {
            url: "https://github.com/octo/widgets.git".to_string(),
            dest: PathBuf::from("/tmp/pr-bot/before"),
        }
        .invocation();
        assert_eq!(inv.program, "git");
        assert_eq!(
            inv.args,
            vec!["clone", "https://github.com/octo/widgets.git", "/tmp/pr-bot/before"]
        );
        assert!(inv.cwd.is_none());
    }

    #[test]
    fn test_checkout_runs_inside_repo() {
        let inv = BuildStep::Checkout {
            reference: "abc123".to_string(),
            repo: PathBuf::from("/tmp/pr-bot/after"),
        }
        .invocation();
        assert_eq!(inv.args, vec!["checkout", "abc123"]);
        assert_eq!(inv.cwd, Some(PathBuf::from("/tmp/pr-bot/after")));
    }

    #[test]
    fn test_build_uses_shell() {
        let inv = BuildStep::Build {
            command: DEFAULT_BUILD_COMMAND.to_string(),
            dir: PathBuf::from("."),
        }
        .invocation();
        assert_eq!(inv.program, "sh");
        assert_eq!(inv.args[1], DEFAULT_BUILD_COMMAND);
    }
}
