use log::{error, info};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::snapshot::Snapshot;
use crate::core::sync::lock;

/// Identifies a connected sink for the lifetime of its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(u64);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

/// Why a payload could not be handed to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Sink outbox is full")]
    Full,

    #[error("Sink is closed")]
    Closed,
}

/// A connected observer that receives serialized snapshots.
///
/// Delivery must not block: a sink that cannot take the payload right now
/// reports an error and is dropped from the broadcast set.
pub trait Sink: Send {
    fn try_deliver(&self, payload: Arc<str>) -> Result<(), DeliveryError>;
}

/// Sink backed by a bounded channel drained by the connection's writer task
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<str>>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its outbox
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn try_deliver(&self, payload: Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(payload).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Per-publish delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// The set of connected sinks and the fan-out over it
pub struct Broadcaster {
    sinks: Mutex<BTreeMap<SinkId, Box<dyn Sink>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a sink to the broadcast set
    pub fn connect(&self, sink: Box<dyn Sink>) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.sinks).insert(id, sink);
        info!("{} connected", id);
        id
    }

    /// Remove a sink. Returns false if it was already gone.
    pub fn disconnect(&self, id: SinkId) -> bool {
        let removed = lock(&self.sinks).remove(&id).is_some();
        if removed {
            info!("{} disconnected", id);
        }
        removed
    }

    #[cfg(test)]
    pub fn is_connected(&self, id: SinkId) -> bool {
        lock(&self.sinks).contains_key(&id)
    }

    /// Number of connected sinks
    pub fn len(&self) -> usize {
        lock(&self.sinks).len()
    }

    /// Drop every sink, closing their outboxes
    pub fn clear(&self) {
        let mut sinks = lock(&self.sinks);
        if !sinks.is_empty() {
            info!("Closing {} sink(s)", sinks.len());
        }
        sinks.clear();
    }

    /// Serialize the snapshot once and deliver it to every sink
    pub fn publish(&self, snapshot: &Snapshot) -> BroadcastReport {
        match snapshot.encode() {
            Ok(text) => self.deliver(Arc::from(text)),
            Err(err) => {
                error!("Failed to encode snapshot: {}", err);
                BroadcastReport::default()
            }
        }
    }

    /// Deliver one payload to every sink. Failed sinks are removed after
    /// the whole pass.
    pub fn deliver(&self, payload: Arc<str>) -> BroadcastReport {
        let mut sinks = lock(&self.sinks);
        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();

        for (id, sink) in sinks.iter() {
            match sink.try_deliver(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    info!("Dropping {}: {}", id, err);
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            sinks.remove(&id);
            report.pruned += 1;
        }
        report
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
