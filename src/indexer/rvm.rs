//! Two-tier indexer for rvm-managed Ruby projects.
//!
//! The project tree goes to `<tag_file>.project`, the gemset to
//! `<tag_file>.gemset`, and both are combined into `<tag_file>`. The gemset
//! tier is only rebuilt when its file is missing or the lock file changed.

use std::path::{Path, PathBuf};

use super::error::{IndexError, IndexResult};
use super::gemset::{GemsetLocator, RvmGemsetLocator};
use super::generic::GenericIndexer;
use super::Indexable;
use crate::config::IndexerConfig;
use crate::utils;
use crate::watcher::{ReindexEvent, WatchError, Watchable};

pub struct RvmIndexer {
    base: GenericIndexer,
    locator: Box<dyn GemsetLocator>,
}

impl RvmIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self::with_locator(config, RvmGemsetLocator::new())
    }

    pub fn with_locator(config: IndexerConfig, locator: impl GemsetLocator + 'static) -> Self {
        Self {
            base: GenericIndexer::new(config),
            locator: Box::new(locator),
        }
    }

    pub fn project_tag_file(&self) -> String {
        format!("{}.project", self.base.config().tag_file)
    }

    pub fn gemset_tag_file(&self) -> String {
        format!("{}.gemset", self.base.config().tag_file)
    }

    fn index_project(&self, root: &Path) -> IndexResult<()> {
        self.base.run(root, &self.project_tag_file(), Path::new("."))
    }

    fn index_gemset(&self, root: &Path) -> IndexResult<()> {
        let gemset = self.locator.gemset_path(root)?;
        crate::debug_event!("rvm", "gemset", "{}", gemset.display());
        self.base.run(root, &self.gemset_tag_file(), &gemset)
    }

    fn needs_gemset(&self, root: &Path, event: &ReindexEvent) -> bool {
        self.locator.is_ruby(root)
            && (event.is_special || !utils::file_exists(root.join(self.gemset_tag_file())))
    }

    /// Combine the tier files that exist, project first.
    fn combine(&self, root: &Path) -> IndexResult<()> {
        let target = root.join(&self.base.config().tag_file);
        let tiers: Vec<PathBuf> = [self.project_tag_file(), self.gemset_tag_file()]
            .into_iter()
            .map(|name| root.join(name))
            .filter(|path| path.is_file())
            .collect();

        if tiers.is_empty() {
            return Err(IndexError::NothingToConcat { target });
        }

        utils::concat_files(&target, &tiers)
            .map_err(|source| IndexError::Concat { target, source })
    }
}

impl Indexable for RvmIndexer {
    fn name(&self) -> &'static str {
        "rvm"
    }

    fn index(&self, root: &Path, event: &ReindexEvent) -> IndexResult<()> {
        // A failed tier leaves its previous file in place
        self.index_project(root)
            .unwrap_or_else(|e| tracing::error!("[rvm] project pass: {e}"));
        if self.needs_gemset(root, event) {
            self.index_gemset(root)
                .unwrap_or_else(|e| tracing::error!("[rvm] gemset pass: {e}"));
        }

        self.combine(root)
    }

    fn create_watcher(&self, root: &Path) -> Result<Box<dyn Watchable>, WatchError> {
        self.base.watcher(root, Some(&self.base.config().special_file))
    }
}
