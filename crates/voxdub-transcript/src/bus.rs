//! Broadcast distribution of call events to session consumers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::types::CallEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for call events.
///
/// Publishing never blocks; slow subscribers lag and skip the events
/// they missed rather than stalling the feed.
#[derive(Clone)]
pub struct TranscriptBus {
    tx: broadcast::Sender<CallEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl TranscriptBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publishes an event to all live subscribers.
    ///
    /// Returns the number of subscribers the event reached. Zero is not
    /// an error; events published before anyone subscribes are dropped.
    pub fn publish(&self, event: CallEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    /// Opens a subscription that receives every event published after
    /// this call. Dropping the subscription unregisters it.
    pub fn subscribe(&self) -> Subscription {
        self.subscribers.fetch_add(1, Ordering::Relaxed);
        Subscription {
            rx: self.tx.subscribe(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Number of currently open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::Relaxed)
    }
}

impl Default for TranscriptBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to the transcript bus.
///
/// Unregisters itself on drop, so holding one is the only bookkeeping
/// a consumer has to do.
pub struct Subscription {
    rx: broadcast::Receiver<CallEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the bus is gone and the backlog is drained.
    /// A lagged receiver logs the gap and keeps going from the oldest
    /// retained event.
    pub async fn recv(&mut self) -> Option<CallEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "transcript", skipped, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}
