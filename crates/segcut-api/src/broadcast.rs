//! Fan-out of job events to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use segcut_media::EventSink;
use segcut_models::StreamEvent;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

use crate::metrics;

/// Subscriber handle returned by [`SubscriberRegistry::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::Receiver<String>,
}

/// Registry of live subscribers, each with its own bounded queue.
///
/// Delivery is best effort: a subscriber whose queue is full misses the
/// message, and a subscriber whose receiver is gone is pruned.
#[derive(Debug)]
pub struct SubscriberRegistry {
    buffer: usize,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<u64, mpsc::Sender<String>>>,
}

impl SubscriberRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::channel(self.buffer);
        self.subscribers.write().await.insert(id, tx);
        debug!(subscriber = id, "Subscriber registered");
        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, id: u64) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!(subscriber = id, "Subscriber removed");
        }
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Offer `text` to every subscriber without waiting.
    ///
    /// Returns how many subscribers accepted it.
    pub async fn broadcast(&self, text: &str) -> usize {
        self.fan_out(text).await.0
    }

    /// Returns `(delivered, dropped)`.
    async fn fan_out(&self, text: &str) -> (usize, usize) {
        let mut delivered = 0;
        let mut dropped = 0;
        let mut closed = Vec::new();

        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                match tx.try_send(text.to_string()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        trace!(subscriber = id, "Subscriber queue full, message skipped");
                        dropped += 1;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &closed {
                subscribers.remove(id);
            }
            debug!(count = closed.len(), "Pruned closed subscribers");
        }

        (delivered, dropped)
    }
}

#[async_trait]
impl EventSink for SubscriberRegistry {
    async fn publish(&self, event: StreamEvent) {
        let (delivered, dropped) = self.fan_out(&event.to_text()).await;
        metrics::record_broadcast(event.kind(), delivered, dropped);
    }
}
