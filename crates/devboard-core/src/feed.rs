// ── Topology feed ──
//
// Stand-in for a realtime transport: one snapshot shortly after connect,
// then a payload-free liveness signal on a fixed period. The subscription
// owns the background task; dropping or shutting it down stops every timer.

use std::fs;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::CoreError;
use crate::model::TopologySnapshot;

// ── Sources ─────────────────────────────────────────────────────────

/// Produces the topology payload delivered by the feed.
pub trait TopologySource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn snapshot(&self) -> Result<TopologySnapshot, CoreError>;
}

/// Delivers a fresh copy of a fixed snapshot each time.
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: TopologySnapshot,
}

impl StaticSource {
    pub fn new(snapshot: TopologySnapshot) -> Self {
        Self { snapshot }
    }
}

impl TopologySource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn snapshot(&self) -> Result<TopologySnapshot, CoreError> {
        Ok(self.snapshot.clone())
    }
}

/// Reads and parses a JSON payload file on every delivery.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TopologySource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    fn snapshot(&self) -> Result<TopologySnapshot, CoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| CoreError::Payload {
            message: format!("cannot read {}: {e}", self.path.display()),
        })?;
        TopologySnapshot::from_json(&raw)
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// One delivery from the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Full topology replace.
    Snapshot(TopologySnapshot),
    /// Liveness only. Carries no data and must not trigger reconciliation.
    Heartbeat,
}

// ── Subscription ────────────────────────────────────────────────────

/// Handle to a running feed.
///
/// Dropping the subscription cancels the background task.
pub struct FeedSubscription {
    rx: mpsc::UnboundedReceiver<FeedMessage>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl FeedSubscription {
    /// Spawn the feed task. Must be called from within a tokio runtime.
    ///
    /// `cancel` may be shared with other tasks; the subscription cancels a
    /// child of it, so shutting the feed down never cancels the parent.
    pub fn connect(
        source: Arc<dyn TopologySource>,
        config: &FeedConfig,
        cancel: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = cancel.child_token();
        let task = tokio::spawn(feed_task(source, config.clone(), tx, cancel.clone()));
        let guard = cancel.clone().drop_guard();

        Self {
            rx,
            cancel,
            task,
            _guard: guard,
        }
    }

    /// Wait for the next message. `None` once the feed has ended or been
    /// shut down; nothing is delivered after shutdown, buffered or not.
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            msg = self.rx.recv() => msg,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    /// Stop the feed: no further snapshot, no further heartbeat.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    /// Convert into a `Stream`. Dropping the stream stops the feed.
    pub fn into_stream(self) -> FeedStream {
        FeedStream {
            inner: UnboundedReceiverStream::new(self.rx),
            _guard: self._guard,
        }
    }
}

/// `Stream` adapter over a [`FeedSubscription`].
pub struct FeedStream {
    inner: UnboundedReceiverStream<FeedMessage>,
    _guard: DropGuard,
}

impl Stream for FeedStream {
    type Item = FeedMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ── Background task ─────────────────────────────────────────────────

async fn feed_task(
    source: Arc<dyn TopologySource>,
    config: FeedConfig,
    tx: mpsc::UnboundedSender<FeedMessage>,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("feed cancelled before first snapshot");
            return;
        }
        () = tokio::time::sleep(config.initial_delay) => {}
    }

    match source.snapshot() {
        Ok(snapshot) => {
            info!(
                source = source.name(),
                groups = snapshot.groups.len(),
                devices = snapshot.devices.len(),
                "delivering topology snapshot"
            );
            if tx.send(FeedMessage::Snapshot(snapshot)).is_err() {
                return;
            }
        }
        Err(e) => {
            warn!(error = %e, source = source.name(), "topology source failed");
        }
    }

    if config.heartbeat_interval.is_zero() {
        debug!("heartbeat disabled, feed task done");
        return;
    }

    let mut interval = tokio::time::interval(config.heartbeat_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                debug!("feed heartbeat");
                if tx.send(FeedMessage::Heartbeat).is_err() {
                    break;
                }
            }
        }
    }
    debug!("feed task stopped");
}
