//! Consumer capability
//!
//! The hub only needs three things from a listener: an identity, a
//! non-blocking way to queue a frame, and a way to close its queue. `close`
//! takes the consumer by value, so once the hub has closed a consumer it no
//! longer holds it and cannot close it again.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Identity of a registered consumer
pub type ConsumerId = Uuid;

/// Why a frame could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The consumer is not draining its queue fast enough
    #[error("outbound queue full")]
    Full,
    /// The receiving side has gone away
    #[error("outbound queue closed")]
    Closed,
}

/// Something the hub can fan frames out to
pub trait Consumer: Send + 'static {
    fn id(&self) -> ConsumerId;

    /// Label for logs, usually the peer address
    fn label(&self) -> &str;

    /// Queue a frame without waiting
    fn try_enqueue(&self, frame: Bytes) -> Result<(), EnqueueError>;

    /// Close the outbound queue. Frames already queued are still delivered.
    fn close(self: Box<Self>);
}

/// Consumer backed by a bounded tokio channel
///
/// The consumer holds the only sender, so closing it (or dropping it) ends the
/// receiver's stream once the queued frames are drained.
#[derive(Debug)]
pub struct ChannelConsumer {
    id: ConsumerId,
    label: String,
    tx: mpsc::Sender<Bytes>,
}

impl ChannelConsumer {
    /// Create a consumer with a fresh id and its receiving half
    ///
    /// `capacity` is clamped to at least one frame.
    pub fn new(label: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let consumer = Self {
            id: Uuid::new_v4(),
            label: label.into(),
            tx,
        };
        (consumer, rx)
    }
}

impl Consumer for ChannelConsumer {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn try_enqueue(&self, frame: Bytes) -> Result<(), EnqueueError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    fn close(self: Box<Self>) {
        tracing::trace!(consumer = %self.label, "Closing outbound queue");
        drop(self);
    }
}
