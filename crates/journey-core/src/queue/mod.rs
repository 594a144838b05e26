//! Queue module: bounded, ordered, single-consumer event conduit.

mod channel;

pub use channel::{EventQueue, EventReceiver};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Enqueue after close: producers outlived the pipeline.
    #[error("event queue is closed")]
    Closed,
}
