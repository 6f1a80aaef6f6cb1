// ── Change notification ──
//
// The store bumps a revision counter on every state change. Consumers
// subscribe to learn *when* to recompute their derived views; the views
// themselves stay plain functions.

mod filter;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use filter::DeviceFilter;

/// A subscription to store revisions.
pub struct StateChanges {
    current: u64,
    receiver: watch::Receiver<u64>,
}

impl StateChanges {
    pub(crate) fn new(receiver: watch::Receiver<u64>) -> Self {
        let current = *receiver.borrow();
        Self { current, receiver }
    }

    /// Revision seen at creation time or at the last `changed()`.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Latest revision (may have moved since the last `changed()`).
    pub fn latest(&self) -> u64 {
        *self.receiver.borrow()
    }

    /// Wait for the next change, returning the new revision.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<u64> {
        self.receiver.changed().await.ok()?;
        let revision = *self.receiver.borrow_and_update();
        self.current = revision;
        Some(revision)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> RevisionStream {
        RevisionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each new revision.
pub struct RevisionStream {
    inner: WatchStream<u64>,
}

impl Stream for RevisionStream {
    type Item = u64;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
