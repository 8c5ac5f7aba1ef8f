//! Tag file generation.
//!
//! An [`Indexable`] knows how to regenerate the tag file of a project root
//! and how to build the watcher that decides when that is needed.

mod error;
mod gemset;
mod generic;
mod rvm;

pub use error::{IndexError, IndexResult};
pub use gemset::{GemsetLocator, RvmGemsetLocator};
pub use generic::GenericIndexer;
pub use rvm::RvmIndexer;

use std::path::Path;
use std::sync::Arc;

use crate::config::{IndexerConfig, IndexerKind};
use crate::watcher::{ReindexEvent, WatchError, Watchable};

/// Indexer capability shared by every project of a manager.
///
/// `index` is blocking and runs on the blocking thread pool.
pub trait Indexable: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Regenerate the tag file under `root`.
    fn index(&self, root: &Path, event: &ReindexEvent) -> IndexResult<()>;

    /// Build a watcher configured with this indexer's exclusions and period.
    fn create_watcher(&self, root: &Path) -> Result<Box<dyn Watchable>, WatchError>;
}

/// Build the indexer variant selected by `config.kind`.
pub fn from_config(config: &IndexerConfig) -> Arc<dyn Indexable> {
    match config.kind {
        IndexerKind::Generic => Arc::new(GenericIndexer::new(config.clone())),
        IndexerKind::Rvm => Arc::new(RvmIndexer::new(config.clone())),
    }
}
