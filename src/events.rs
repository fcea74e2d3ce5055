use serde::{Deserialize, Serialize};
use tracing::warn;

/// Order lifecycle events, drained by a logging task at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderInitiated {
        order_id: String,
        amount_minor: i64,
    },
    OrderConfirmed {
        order_id: String,
        payment_intent_id: String,
    },
    NotificationsSent {
        order_id: String,
    },
}

#[derive(Clone)]
pub struct EventSender {
    tx: tokio::sync::mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(tx: tokio::sync::mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: Event) -> Result<(), anyhow::Error> {
        self.tx.send(event).await?;
        Ok(())
    }

    /// Send without failing the caller; a full or closed channel only loses
    /// the event, never the order.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Failed to send event: {}", e);
        }
    }
}
