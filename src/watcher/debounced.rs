//! Debounced watcher driving one raw adapter's event stream.
//!
//! The loop waits on cancellation, raw events, and a fixed ticker. A
//! qualifying event moves the debouncer to `Pending`; the next tick emits one
//! [`ReindexEvent`] and returns it to `Idle`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::event::{FsEvent, ReindexEvent};
use super::fs_watcher::{FsWatchable, FsWatcher};
use super::path_set::PathSet;

/// Watcher capability consumed by a project.
#[async_trait]
pub trait Watchable: Send {
    /// Run the watch loop until `token` is cancelled.
    ///
    /// Fails only if the initial registration of the root fails.
    async fn watch(&mut self, token: CancellationToken) -> Result<(), WatchError>;

    /// Take the stream of coalesced events. Yields `Some` once.
    fn events(&mut self) -> Option<mpsc::Receiver<ReindexEvent>>;

    /// Release the underlying OS resources. Idempotent.
    fn close(&mut self);
}

/// Periodic coalescing watcher over an [`FsWatchable`].
pub struct DebouncedWatcher<W: FsWatchable = FsWatcher> {
    root: PathBuf,
    max_period: Duration,
    special_file: Option<String>,
    fs_watcher: W,
    debouncer: Debouncer,
    events_tx: Option<mpsc::Sender<ReindexEvent>>,
    events_rx: Option<mpsc::Receiver<ReindexEvent>>,
    closed: bool,
}

impl DebouncedWatcher<FsWatcher> {
    /// Create a watcher for `root` backed by the OS primitive.
    pub fn new(
        root: impl Into<PathBuf>,
        exclusions: PathSet,
        tag_file_prefix: &str,
        max_period: Duration,
    ) -> Result<Self, WatchError> {
        let fs_watcher = FsWatcher::new(exclusions, tag_file_prefix)?;
        Ok(Self::with_fs_watcher(root, fs_watcher, max_period))
    }
}

impl<W: FsWatchable> DebouncedWatcher<W> {
    /// Create a watcher over an existing raw adapter.
    pub fn with_fs_watcher(root: impl Into<PathBuf>, fs_watcher: W, max_period: Duration) -> Self {
        // capacity 1: an unconsumed emission is merged into the next one
        let (tx, rx) = mpsc::channel(1);

        Self {
            root: root.into(),
            max_period: max_period.max(Duration::from_millis(1)),
            special_file: None,
            fs_watcher,
            debouncer: Debouncer::new(),
            events_tx: Some(tx),
            events_rx: Some(rx),
            closed: false,
        }
    }

    /// Base name whose change marks the emission as special.
    pub fn with_special_file(mut self, name: impl Into<String>) -> Self {
        self.special_file = Some(name.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_period(&self) -> Duration {
        self.max_period
    }

    pub fn special_file(&self) -> Option<&str> {
        self.special_file.as_deref()
    }

    pub fn fs_watcher(&self) -> &W {
        &self.fs_watcher
    }

    fn is_special(&self, event: &FsEvent) -> bool {
        self.special_file
            .as_deref()
            .is_some_and(|special| event.file_name() == Some(special))
    }

    fn record(&mut self, event: FsEvent) {
        if self.fs_watcher.handle(&event) {
            let special = self.is_special(&event);
            self.debouncer.record(event.path, special);
        }
    }

    /// Emit the pending event, if any. Returns false once nobody listens.
    fn flush(&mut self) -> bool {
        let Some(tx) = self.events_tx.as_ref() else {
            return false;
        };
        let Some(event) = self.debouncer.take_ready() else {
            return true;
        };

        match tx.try_send(event) {
            Ok(()) => {
                crate::debug_event!("watcher", "emitted", "{}", self.root.display());
                true
            }
            Err(TrySendError::Full(event)) => {
                self.debouncer.restore(event);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[async_trait]
impl<W: FsWatchable> Watchable for DebouncedWatcher<W> {
    async fn watch(&mut self, token: CancellationToken) -> Result<(), WatchError> {
        self.fs_watcher.add(&self.root)?;
        crate::log_event!("watcher", "watching", "{}", self.root.display());

        let mut ticker = tokio::time::interval(self.max_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                // ahead of raw events so a steady stream cannot hold back emissions
                _ = ticker.tick() => {
                    if !self.flush() {
                        break;
                    }
                }

                event = self.fs_watcher.next_event() => match event {
                    Some(Ok(event)) => self.record(event),
                    Some(Err(e)) => tracing::error!("[watcher] {e}"),
                    None => {
                        crate::debug_event!("watcher", "event stream ended");
                        break;
                    }
                },
            }
        }

        crate::debug_event!("watcher", "stopped", "{}", self.root.display());
        Ok(())
    }

    fn events(&mut self) -> Option<mpsc::Receiver<ReindexEvent>> {
        self.events_rx.take()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.events_tx = None;
        self.fs_watcher.close();
    }
}
