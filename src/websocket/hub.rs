//! Broadcast Hub
//!
//! One task owns the set of registered consumers. Everything else talks to it
//! through a [`Hub`] handle, which queues register, unregister, broadcast and
//! count requests on a single ordered channel. The task handles one request
//! at a time, so the consumer set needs no lock and a caller's requests are
//! applied in the order it sent them.
//!
//! Broadcasting never waits on a consumer: each frame is offered with
//! `try_enqueue`, and a consumer whose queue is full is removed and closed on
//! the spot.

use bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::consumer::{Consumer, ConsumerId, EnqueueError};

/// Configuration for the hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Requests buffered in front of the hub task
    pub request_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            request_capacity: 1024,
        }
    }
}

enum Request {
    Register(Box<dyn Consumer>),
    Unregister(ConsumerId),
    Broadcast(Bytes),
    Count(oneshot::Sender<usize>),
}

/// Handle to a running hub
///
/// Cheap to clone. The hub task exits once every handle has been dropped.
#[derive(Clone)]
pub struct Hub {
    requests: mpsc::Sender<Request>,
}

impl Hub {
    /// Start the hub task on the current tokio runtime
    pub fn spawn(config: HubConfig) -> Self {
        let (requests, rx) = mpsc::channel(config.request_capacity.max(1));
        tokio::spawn(HubWorker::new(rx).run());
        Self { requests }
    }

    /// Add a consumer. Registering an id that is already present is ignored.
    pub async fn register(&self, consumer: impl Consumer) -> Result<(), HubError> {
        self.send(Request::Register(Box::new(consumer))).await
    }

    /// Remove a consumer and close its queue. Unknown ids are ignored.
    pub async fn unregister(&self, id: ConsumerId) -> Result<(), HubError> {
        self.send(Request::Unregister(id)).await
    }

    /// Offer a frame to every registered consumer
    pub async fn broadcast(&self, frame: Bytes) -> Result<(), HubError> {
        self.send(Request::Broadcast(frame)).await
    }

    /// Number of registered consumers, as seen by the hub task after every
    /// request sent before this one
    pub async fn count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(Request::Count(tx)).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    async fn send(&self, request: Request) -> Result<(), HubError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| HubError::Stopped)
    }
}

/// The task that owns the consumer set
struct HubWorker {
    consumers: HashMap<ConsumerId, Box<dyn Consumer>>,
    requests: mpsc::Receiver<Request>,
}

impl HubWorker {
    fn new(requests: mpsc::Receiver<Request>) -> Self {
        Self {
            consumers: HashMap::new(),
            requests,
        }
    }

    async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.handle(request);
        }

        let remaining = self.consumers.len();
        for (_, consumer) in self.consumers.drain() {
            consumer.close();
        }
        tracing::info!(consumers = remaining, "Hub stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Register(consumer) => self.register(consumer),
            Request::Unregister(id) => self.unregister(id),
            Request::Broadcast(frame) => self.broadcast(frame),
            Request::Count(reply) => {
                let _ = reply.send(self.consumers.len());
            }
        }
    }

    fn register(&mut self, consumer: Box<dyn Consumer>) {
        match self.consumers.entry(consumer.id()) {
            Entry::Occupied(_) => {
                tracing::debug!(consumer = %consumer.label(), "Consumer already registered");
            }
            Entry::Vacant(slot) => {
                tracing::info!(consumer = %consumer.label(), "Registered consumer");
                slot.insert(consumer);
            }
        }
    }

    fn unregister(&mut self, id: ConsumerId) {
        if let Some(consumer) = self.consumers.remove(&id) {
            tracing::info!(consumer = %consumer.label(), "Unregistered consumer");
            consumer.close();
        }
    }

    fn broadcast(&mut self, frame: Bytes) {
        let rejected: Vec<(ConsumerId, EnqueueError)> = self
            .consumers
            .iter()
            .filter_map(|(id, consumer)| {
                consumer
                    .try_enqueue(frame.clone())
                    .err()
                    .map(|reason| (*id, reason))
            })
            .collect();

        for (id, reason) in rejected {
            let Some(consumer) = self.consumers.remove(&id) else {
                continue;
            };
            match reason {
                EnqueueError::Full => {
                    tracing::warn!(consumer = %consumer.label(), "Dropped unresponsive consumer");
                }
                EnqueueError::Closed => {
                    tracing::debug!(consumer = %consumer.label(), "Dropped disconnected consumer");
                }
            }
            consumer.close();
        }
    }
}

/// Errors that can occur when talking to the hub
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("Hub is no longer running")]
    Stopped,
}
