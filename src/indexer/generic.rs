//! Single-tier indexer: one tag generator run over the project tree.

use std::ffi::OsString;
use std::path::Path;

use super::error::{IndexError, IndexResult};
use super::Indexable;
use crate::config::IndexerConfig;
use crate::utils;
use crate::watcher::{DebouncedWatcher, PathSet, ReindexEvent, WatchError, Watchable};

/// Runs the configured tag generator in the project root.
#[derive(Debug, Clone)]
pub struct GenericIndexer {
    config: IndexerConfig,
}

impl GenericIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// User arguments followed by one `--exclude=<dir>` per excluded name.
    pub fn base_arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.config.args.iter().map(OsString::from).collect();
        args.extend(
            self.config
                .exclude
                .iter()
                .map(|dir| OsString::from(format!("--exclude={dir}"))),
        );
        args
    }

    /// Full argument list writing `tag_file` from `input`.
    pub fn arguments(&self, tag_file: &str, input: &Path) -> Vec<OsString> {
        let mut args = self.base_arguments();
        args.push(OsString::from("-f"));
        args.push(OsString::from(tag_file));
        args.push(input.as_os_str().to_os_string());
        args
    }

    /// Run the generator in `root`, writing `tag_file` from `input`.
    pub fn run(&self, root: &Path, tag_file: &str, input: &Path) -> IndexResult<()> {
        let program = &self.config.program;
        let out = utils::exec_in_path(program, self.arguments(tag_file, input), root).map_err(
            |source| IndexError::Spawn {
                program: program.clone(),
                dir: root.to_path_buf(),
                source,
            },
        )?;

        if !out.success() {
            return Err(IndexError::CommandFailed {
                program: program.clone(),
                dir: root.to_path_buf(),
                status: out.status.to_string(),
                output: out.output.trim().to_string(),
            });
        }

        crate::debug_event!("indexer", "wrote", "{}", root.join(tag_file).display());
        Ok(())
    }

    /// Watcher over `root`, optionally marking changes to `special_file`.
    pub(crate) fn watcher(
        &self,
        root: &Path,
        special_file: Option<&str>,
    ) -> Result<Box<dyn Watchable>, WatchError> {
        let mut watcher = DebouncedWatcher::new(
            root,
            PathSet::new(self.config.exclude.iter().cloned()),
            &self.config.tag_file,
            self.config.max_period(),
        )?;
        if let Some(name) = special_file {
            watcher = watcher.with_special_file(name);
        }
        Ok(Box::new(watcher))
    }
}

impl Indexable for GenericIndexer {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn index(&self, root: &Path, _event: &ReindexEvent) -> IndexResult<()> {
        self.run(root, &self.config.tag_file, Path::new("."))
    }

    fn create_watcher(&self, root: &Path) -> Result<Box<dyn Watchable>, WatchError> {
        self.watcher(root, None)
    }
}
