//! Event sink seam between the pipeline and whoever listens to it.

use async_trait::async_trait;
use segcut_models::StreamEvent;
use tokio::sync::Mutex;

/// Receiver of pipeline events.
///
/// Implementations must not block on slow consumers; delivery is best effort.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: StreamEvent);
}

/// Sink that records every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<StreamEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events published so far.
    pub async fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, event: StreamEvent) {
        self.events.lock().await.push(event);
    }
}
