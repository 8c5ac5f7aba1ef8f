//! Recursive, debounced filesystem watching.
//!
//! # Architecture
//!
//! ```text
//! DebouncedWatcher (one per project)
//!   - ticker, cancellation token
//!   - Debouncer (Idle / Pending)
//!   - emits ReindexEvent at most once per period
//!         |
//!     FsWatcher
//!       - notify::RecommendedWatcher, one flat watch per directory
//!       - PathSet exclusions, discover() for subtrees
//!       - classifies FsEvents, maintains the watched set
//! ```

mod debounced;
mod debouncer;
mod discover;
mod error;
mod event;
mod fs_watcher;
mod path_set;

pub use debounced::{DebouncedWatcher, Watchable};
pub use debouncer::{DebounceState, Debouncer};
pub use discover::discover;
pub use error::WatchError;
pub use event::{FsEvent, FsOp, ReindexEvent};
pub use fs_watcher::{FsWatchable, FsWatcher};
pub use path_set::PathSet;
