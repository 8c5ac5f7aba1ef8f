//! In-memory indexer and watcher doubles for lifecycle tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::indexer::{IndexResult, Indexable};
use crate::watcher::{ReindexEvent, WatchError, Watchable};

/// Indexer that records passes and hands out [`MockWatcher`]s.
#[derive(Default)]
pub struct MockIndexer {
    pub passes: Arc<Mutex<Vec<(PathBuf, ReindexEvent)>>>,
    pub closes: Arc<AtomicUsize>,
    pub watches: Arc<AtomicUsize>,
    /// Time each pass takes after it is recorded.
    delay: Duration,
    fail_create: bool,
    fail_watch: bool,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watcher construction fails as if the OS primitive were unavailable.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// Every pass blocks for `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Watchers fail to register their root.
    pub fn failing_watch() -> Self {
        Self {
            fail_watch: true,
            ..Self::default()
        }
    }

    pub fn pass_count(&self) -> usize {
        self.passes.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn watch_count(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }

    pub fn watcher(&self) -> MockWatcher {
        MockWatcher::new(
            Arc::clone(&self.closes),
            Arc::clone(&self.watches),
            self.fail_watch,
        )
    }
}

impl Indexable for MockIndexer {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn index(&self, root: &Path, event: &ReindexEvent) -> IndexResult<()> {
        self.passes.lock().push((root.to_path_buf(), event.clone()));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(())
    }

    fn create_watcher(&self, _root: &Path) -> Result<Box<dyn Watchable>, WatchError> {
        if self.fail_create {
            return Err(WatchError::InitFailed {
                reason: "no watch primitive".to_string(),
            });
        }
        Ok(Box::new(self.watcher()))
    }
}

/// Watcher that idles until cancelled and counts closes.
pub struct MockWatcher {
    tx: mpsc::Sender<ReindexEvent>,
    rx: Option<mpsc::Receiver<ReindexEvent>>,
    closes: Arc<AtomicUsize>,
    watches: Arc<AtomicUsize>,
    fail_watch: bool,
    closed: bool,
}

impl MockWatcher {
    pub fn new(closes: Arc<AtomicUsize>, watches: Arc<AtomicUsize>, fail_watch: bool) -> Self {
        let (tx, rx) = mpsc::channel(8);
        Self {
            tx,
            rx: Some(rx),
            closes,
            watches,
            fail_watch,
            closed: false,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<ReindexEvent> {
        self.tx.clone()
    }
}

#[async_trait]
impl Watchable for MockWatcher {
    async fn watch(&mut self, token: CancellationToken) -> Result<(), WatchError> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        if self.fail_watch {
            return Err(WatchError::DiscoveryFailed {
                root: PathBuf::from("/mock"),
                reason: "denied".to_string(),
            });
        }
        token.cancelled().await;
        Ok(())
    }

    fn events(&mut self) -> Option<mpsc::Receiver<ReindexEvent>> {
        self.rx.take()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
