use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Batch events
    BatchCreated(Uuid),
    BatchUpdated(Uuid),
    BatchDeleted(Uuid),

    // Stock movement events
    StockDispatched {
        entry_ids: Vec<Uuid>,
        note: Option<String>,
    },
    StockReturned {
        entry_ids: Vec<Uuid>,
    },
    StockScrapped {
        entry_ids: Vec<Uuid>,
        reason: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BatchCreated(_) => "batch.created",
            Event::BatchUpdated(_) => "batch.updated",
            Event::BatchDeleted(_) => "batch.deleted",
            Event::StockDispatched { .. } => "stock.dispatched",
            Event::StockReturned { .. } => "stock.returned",
            Event::StockScrapped { .. } => "stock.scrapped",
        }
    }
}

/// Cloneable handle for publishing events onto the shared channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes the event channel for the lifetime of the process, logging
/// each event as structured output.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = event.name(), payload = ?event, "domain event");
    }
    warn!("Event channel closed; event processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::BatchCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::BatchCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn event_names_are_stable() {
        assert_eq!(Event::BatchDeleted(Uuid::new_v4()).name(), "batch.deleted");
        assert_eq!(
            Event::StockScrapped {
                entry_ids: vec![],
                reason: "damaged".into()
            }
            .name(),
            "stock.scrapped"
        );
    }
}
