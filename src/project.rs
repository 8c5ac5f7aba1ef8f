//! One watched directory tree and its indexing lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::indexer::Indexable;
use crate::watcher::{ReindexEvent, WatchError, Watchable};

/// Binds a root directory to its indexer and watcher.
pub struct Project {
    path: PathBuf,
    indexer: Arc<dyn Indexable>,
    watcher: Box<dyn Watchable>,
}

impl Project {
    pub fn new(path: PathBuf, indexer: Arc<dyn Indexable>, watcher: Box<dyn Watchable>) -> Self {
        Self {
            path,
            indexer,
            watcher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index once, then re-index on every coalesced event until `token` is
    /// cancelled or the watcher stops on its own.
    ///
    /// Indexing passes run on the blocking pool and never hold up the
    /// watch loop. Passes of one project do not overlap, and events that
    /// arrive while a pass runs fold into a single follow-up pass.
    pub async fn monitor(self, token: CancellationToken) -> Result<(), WatchError> {
        let Project {
            path,
            indexer,
            mut watcher,
        } = self;

        let mut events = watcher.events().ok_or(WatchError::EventsTaken)?;
        // cancelled on every exit so queued passes never outlive the project
        let scope = token.child_token();
        let passes = PassQueue::new(indexer, path.clone(), scope.clone());

        crate::log_event!("project", "monitoring", "{}", path.display());
        passes.schedule(ReindexEvent::initial());

        let mut watch = tokio::spawn({
            let token = scope.clone();
            async move {
                let result = watcher.watch(token).await;
                watcher.close();
                result
            }
        });

        let finished = loop {
            tokio::select! {
                _ = token.cancelled() => break None,
                joined = &mut watch => break Some(joined),
                event = events.recv() => match event {
                    Some(event) => passes.schedule(event),
                    None => break None,
                },
            }
        };

        scope.cancel();
        let joined = match finished {
            Some(joined) => joined,
            None => watch.await,
        };

        crate::log_event!("project", "stopped", "{}", path.display());
        joined.map_err(|e| WatchError::EventError {
            details: format!("watch task for {}: {e}", path.display()),
        })?
    }
}

/// Indexing passes of one project.
///
/// At most one pass runs and at most one waits behind it.
struct PassQueue {
    indexer: Arc<dyn Indexable>,
    root: PathBuf,
    token: CancellationToken,
    state: Mutex<PassState>,
}

#[derive(Default)]
struct PassState {
    running: bool,
    pending: Option<ReindexEvent>,
}

impl PassQueue {
    fn new(indexer: Arc<dyn Indexable>, root: PathBuf, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            indexer,
            root,
            token,
            state: Mutex::new(PassState::default()),
        })
    }

    fn schedule(self: &Arc<Self>, event: ReindexEvent) {
        {
            let mut state = self.state.lock();
            if state.running {
                match state.pending.as_mut() {
                    Some(pending) => pending.merge(event),
                    None => state.pending = Some(event),
                }
                return;
            }
            state.running = true;
        }

        let queue = Arc::clone(self);
        tokio::task::spawn_blocking(move || queue.drain(event));
    }

    fn drain(&self, mut event: ReindexEvent) {
        loop {
            if self.token.is_cancelled() {
                let mut state = self.state.lock();
                state.pending = None;
                state.running = false;
                crate::debug_event!("indexer", "cancelled", "{}", self.root.display());
                return;
            }

            self.run(&event);

            let mut state = self.state.lock();
            match state.pending.take() {
                Some(next) => event = next,
                None => {
                    state.running = false;
                    return;
                }
            }
        }
    }

    fn run(&self, event: &ReindexEvent) {
        let started = Instant::now();
        match self.indexer.index(&self.root, event) {
            Ok(()) => crate::log_event!(
                "indexer",
                "indexed",
                "{} ({} changes, {:?})",
                self.root.display(),
                event.names.len(),
                started.elapsed()
            ),
            Err(e) => tracing::error!("[{}] {e}", self.indexer.name()),
        }
    }
}
