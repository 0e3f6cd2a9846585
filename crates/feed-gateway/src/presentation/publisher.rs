//! Event emitter
//!
//! Fans normalized events out to subscribers over bounded broadcast
//! channels. Publishing never blocks: a subscriber that falls more than the
//! channel capacity behind loses the oldest events and is told how many.

use dashmap::DashMap;
use feed_core::{FeedEvent, QualifiedSymbol};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("Subscriber lagged, {0} events dropped")]
    Lagged(u64),
    #[error("Publisher closed")]
    Closed,
}

/// Broadcast publisher for feed events
///
/// Supports both global subscriptions and per-symbol subscriptions.
#[derive(Clone)]
pub struct EventPublisher {
    global_tx: broadcast::Sender<FeedEvent>,
    symbol_channels: Arc<DashMap<QualifiedSymbol, broadcast::Sender<FeedEvent>>>,
    published: Arc<AtomicU64>,
    capacity: usize,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (global_tx, _) = broadcast::channel(capacity);

        EventPublisher {
            global_tx,
            symbol_channels: Arc::new(DashMap::new()),
            published: Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.global_tx.subscribe(),
        }
    }

    /// Subscribe to events for one venue symbol
    pub fn subscribe_symbol(&self, key: &QualifiedSymbol) -> EventSubscriber {
        let entry = self.symbol_channels.entry(key.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.capacity);
            tx
        });

        EventSubscriber {
            rx: entry.value().subscribe(),
        }
    }

    /// Publish without waiting on subscribers
    pub fn publish(&self, event: impl Into<FeedEvent>) {
        let event = event.into();
        self.published.fetch_add(1, Ordering::Relaxed);

        if let Some(symbol) = event.symbol() {
            let key = QualifiedSymbol::new(event.exchange().clone(), symbol);
            if let Some(tx) = self.symbol_channels.get(&key) {
                // No receivers is fine
                let _ = tx.send(event.clone());
            }
        }

        let _ = self.global_tx.send(event);
    }

    /// Events published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Live global subscribers
    pub fn subscriber_count(&self) -> usize {
        self.global_tx.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// Receiving end of an [`EventPublisher`]
pub struct EventSubscriber {
    rx: broadcast::Receiver<FeedEvent>,
}

impl EventSubscriber {
    /// Wait for the next event.
    ///
    /// After `Lagged` the subscriber resumes at the oldest retained event.
    pub async fn next(&mut self) -> Result<FeedEvent, SubscriberError> {
        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(SubscriberError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(SubscriberError::Closed),
        }
    }

    pub fn try_next(&mut self) -> Result<Option<FeedEvent>, SubscriberError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(SubscriberError::Lagged(n)),
            Err(broadcast::error::TryRecvError::Closed) => Err(SubscriberError::Closed),
        }
    }
}
