//! Locating the gem directory of a Ruby project.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{IndexError, IndexResult};
use crate::utils;

/// Resolves the dependency tree indexed as the second tier.
pub trait GemsetLocator: Send + Sync {
    /// True when `root` is a Ruby project.
    fn is_ruby(&self, root: &Path) -> bool;

    /// Directory holding the gems of the project's gemset.
    fn gemset_path(&self, root: &Path) -> IndexResult<PathBuf>;
}

/// Asks rvm for the gemset directory, falling back to the
/// `.ruby-version`/`.ruby-gemset` pair.
#[derive(Debug, Clone)]
pub struct RvmGemsetLocator {
    shell: String,
    script: String,
}

impl Default for RvmGemsetLocator {
    fn default() -> Self {
        Self {
            shell: "/bin/bash".to_string(),
            script: r#"source "$HOME/.rvm/scripts/rvm"; cd .; rvm gemset gemdir"#.to_string(),
        }
    }
}

impl RvmGemsetLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the shell invocation. The script's stdout must be the
    /// gemset directory.
    pub fn with_command(shell: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            script: script.into(),
        }
    }

    fn from_rvm(&self, root: &Path) -> IndexResult<PathBuf> {
        let out = utils::exec_in_path(&self.shell, ["-c", self.script.as_str()], root).map_err(
            |e| IndexError::Gemset {
                root: root.to_path_buf(),
                reason: e.to_string(),
            },
        )?;

        let gemdir = out.stdout.trim();
        if !out.success() || gemdir.is_empty() {
            return Err(IndexError::Gemset {
                root: root.to_path_buf(),
                reason: format!("rvm exited with {}: {}", out.status, out.output.trim()),
            });
        }

        Ok(PathBuf::from(gemdir).join("gems"))
    }

    fn from_files(root: &Path) -> IndexResult<PathBuf> {
        let read = |name: &str| {
            fs::read_to_string(root.join(name))
                .map(|s| s.trim().to_string())
                .map_err(|e| IndexError::Gemset {
                    root: root.to_path_buf(),
                    reason: format!("{name}: {e}"),
                })
        };
        let version = read(".ruby-version")?;
        let gemset = read(".ruby-gemset")?;

        let home = dirs::home_dir().ok_or_else(|| IndexError::Gemset {
            root: root.to_path_buf(),
            reason: "no home directory".to_string(),
        })?;

        Ok(home
            .join(".rvm")
            .join("gems")
            .join(format!("{version}@{gemset}"))
            .join("gems"))
    }
}

impl GemsetLocator for RvmGemsetLocator {
    fn is_ruby(&self, root: &Path) -> bool {
        utils::file_exists(root.join("Gemfile"))
    }

    fn gemset_path(&self, root: &Path) -> IndexResult<PathBuf> {
        match self.from_rvm(root) {
            Ok(path) => Ok(path),
            Err(e) => {
                crate::debug_event!("gemset", "rvm lookup failed", "{e}");
                Self::from_files(root)
            }
        }
    }
}
