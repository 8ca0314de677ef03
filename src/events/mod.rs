use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
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

    /// Sends an event, logging instead of failing when the channel is closed
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropped domain event");
        }
    }
}

/// Domain events emitted after an order operation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: i32,
        custom_code: String,
    },
    OrderConfirmed(i32),
    OrderExecuted(i32),
    OrderSentForReview {
        order_id: i32,
        sent_by: i32,
    },
    OrderApproved {
        order_id: i32,
        approved_by: i32,
        file_code: String,
    },
    OrderUpdated(i32),
    /// An approved order went back to review after an edit
    OrderRevised {
        order_id: i32,
        changed_fields: Vec<String>,
    },
    OrderDeleted(i32),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderConfirmed(_) => "order_confirmed",
            Event::OrderExecuted(_) => "order_executed",
            Event::OrderSentForReview { .. } => "order_sent_for_review",
            Event::OrderApproved { .. } => "order_approved",
            Event::OrderUpdated(_) => "order_updated",
            Event::OrderRevised { .. } => "order_revised",
            Event::OrderDeleted(_) => "order_deleted",
        }
    }

    pub fn order_id(&self) -> i32 {
        match self {
            Event::OrderCreated { order_id, .. }
            | Event::OrderSentForReview { order_id, .. }
            | Event::OrderApproved { order_id, .. }
            | Event::OrderRevised { order_id, .. } => *order_id,
            Event::OrderConfirmed(id)
            | Event::OrderExecuted(id)
            | Event::OrderUpdated(id)
            | Event::OrderDeleted(id) => *id,
        }
    }
}

// Handlers registered with process_events see every event in order.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(event = event.name(), order_id = event.order_id(), "Received event");
        counter!("beo.events.processed", 1, "event" => event.name());

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    event = event.name(),
                    order_id = event.order_id(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.seen.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle_event(&self, _event: &Event) -> Result<(), String> {
            Err("nope".into())
        }
    }

    #[tokio::test]
    async fn events_reach_every_handler_even_after_a_failure() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let recorder = Arc::new(Recorder::default());

        let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(Failing), recorder.clone()];
        let worker = tokio::spawn(process_events(rx, handlers));

        sender.send(Event::OrderConfirmed(4)).await.unwrap();
        sender
            .send(Event::OrderRevised {
                order_id: 4,
                changed_fields: vec!["event_name".into()],
            })
            .await
            .unwrap();
        drop(sender);
        worker.await.unwrap();

        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].name(), "order_revised");
        assert_eq!(seen[1].order_id(), 4);
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        EventSender::new(tx).send_or_log(Event::OrderDeleted(1)).await;
    }
}
