//! Domain-event publication: the fabric's stages announce completion
//! so out-of-scope collaborators (RAG indexing, websocket pushes to a
//! UI) can subscribe without the fabric depending on them directly.
//!
//! Grounded on the `tokio::sync::broadcast` channel wiring in
//! `main.rs` (`signal_tx`/`signal_broadcast`, subscriber pattern).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    IngestionCompleted { match_id: String },
    VideoProcessingCompleted { match_id: String, mode: String },
    MetricsComputed { match_id: String },
    PhaseSequenceBuilt { match_id: String, team_id: String },
    PatternsDetected { match_id: String, team_id: String },
    ReportComposed { report_id: String, match_id: String },
}

/// Publication contract. `publish` never blocks on subscriber
/// processing — it's fire-and-forget, matching the `Dispatch`-style
/// split used by the job fabric.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: DomainEvent);
    fn subscribe(&self) -> broadcast::Receiver<DomainEvent>;
}

pub struct InMemoryEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl InMemoryEventBus {
    /// `capacity` bounds the lagging-subscriber buffer; a slow
    /// subscriber drops the oldest events rather than blocking
    /// publishers (standard `tokio::broadcast` semantics).
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, event: DomainEvent) {
        // No subscribers is not an error — publication is fire-and-forget.
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}
