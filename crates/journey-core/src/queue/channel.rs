//! Bounded event channel between the cache and the persistence worker.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::info;

use super::QueueError;
use crate::domain::RouteEvent;
use crate::observability::QueueStats;

/// Producer handle of the event queue.
///
/// Cheap to clone; every clone feeds the same FIFO channel.
/// Overflow policy is *block*: `push` waits for capacity, it never drops.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<RouteEvent>,
    closed: Arc<AtomicBool>,
}

/// The single consumption handle. Not `Clone`: there is no fan-out.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<RouteEvent>,
}

impl EventQueue {
    /// Create a queue and its only receiver.
    ///
    /// `capacity` は [`crate::config::MAX_QUEUE_CAPACITY`] 以下であること（超えると tokio が panic する）。
    pub fn bounded(capacity: NonZeroUsize) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.get());
        let queue = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (queue, EventReceiver { rx })
    }

    /// Enqueue one event, waiting while the queue is full.
    ///
    /// Returns `QueueError::Closed` once the queue was closed or the receiver
    /// is gone. Callers treat that as a lifecycle bug.
    pub async fn push(&self, event: RouteEvent) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        self.tx.send(event).await.map_err(|_| QueueError::Closed)
    }

    /// Mark producer completion. Every later `push` fails.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(pending = self.stats().pending, "event queue closed");
        }
    }

    /// `close()` が呼ばれたか。receiver が消えただけでは `false`（その場合も `push` は失敗する）
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        let capacity = self.tx.max_capacity();
        QueueStats {
            pending: capacity - self.tx.capacity(),
            capacity,
        }
    }
}

impl EventReceiver {
    /// Wait for the next event. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<RouteEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<RouteEvent> {
        self.rx.try_recv().ok()
    }

    /// Number of events buffered but not yet received.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
