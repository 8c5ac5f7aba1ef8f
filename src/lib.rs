//! Watches project trees and keeps their tag files fresh.
//!
//! A [`Manager`] owns one [`Project`] per registered directory. Each project
//! indexes once at startup and again whenever its debounced watcher reports
//! a change.

pub mod cli;
pub mod config;
pub mod indexer;
pub mod logging;
pub mod manager;
pub mod project;
#[cfg(feature = "http-server")]
pub mod server;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use config::Settings;
pub use indexer::{GenericIndexer, Indexable, RvmIndexer};
pub use manager::{AddOutcome, Manager};
pub use project::Project;
pub use watcher::{DebouncedWatcher, ReindexEvent, WatchError, Watchable};
