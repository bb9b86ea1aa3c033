use chrono::NaiveDate;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::notifications::NotificationIntent;

pub mod outbox;

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

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Used after a commit, when the state change already happened.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "dropping event");
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Inventory events
    StockDebited {
        material_id: Uuid,
        quantity: Decimal,
        stock_after: Decimal,
    },
    StockCredited {
        material_id: Uuid,
        quantity: Decimal,
        stock_after: Decimal,
    },
    MaterialCreated(Uuid),
    MaterialDeactivated(Uuid),

    // Production order events
    ProductionOrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    ProductionOrderConfirmed(Uuid),
    ProductionOrderUpdated(Uuid),
    ProductionStarted {
        order_id: Uuid,
        production_time_hours: i32,
    },
    ProductionStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ProductionOrderDelayed {
        order_id: Uuid,
        reason: String,
    },
    ProductionOrderCancelled(Uuid),
    ProductionOrderDeleted(Uuid),
    ProductionIssueReported {
        order_id: Uuid,
        issue_id: Uuid,
        severity: String,
    },
    ProductionIssueUpdated {
        issue_id: Uuid,
        status: String,
    },
    MaterialUsageRecorded {
        order_id: Uuid,
        material_id: Uuid,
        quantity_used: Decimal,
    },

    // Batch and delivery events
    BatchCreated {
        order_id: Uuid,
        batch_id: Uuid,
        batch_number: String,
    },
    BatchStatusChanged {
        batch_id: Uuid,
        status: String,
    },
    BatchShipped {
        batch_id: Uuid,
        delivery_id: Uuid,
        expected_delivery_date: NaiveDate,
    },
    DeliveryReceived(Uuid),
    DeliveryRejected {
        delivery_id: Uuid,
        reason: String,
    },

    /// A notification left the outbox through the event dispatcher.
    NotificationDispatched {
        notification_id: Uuid,
        intent: NotificationIntent,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StockDebited { .. } => "stock_debited",
            Event::StockCredited { .. } => "stock_credited",
            Event::MaterialCreated(_) => "material_created",
            Event::MaterialDeactivated(_) => "material_deactivated",
            Event::ProductionOrderCreated { .. } => "production_order_created",
            Event::ProductionOrderConfirmed(_) => "production_order_confirmed",
            Event::ProductionOrderUpdated(_) => "production_order_updated",
            Event::ProductionStarted { .. } => "production_started",
            Event::ProductionStatusChanged { .. } => "production_status_changed",
            Event::ProductionOrderDelayed { .. } => "production_order_delayed",
            Event::ProductionOrderCancelled(_) => "production_order_cancelled",
            Event::ProductionOrderDeleted(_) => "production_order_deleted",
            Event::ProductionIssueReported { .. } => "production_issue_reported",
            Event::ProductionIssueUpdated { .. } => "production_issue_updated",
            Event::MaterialUsageRecorded { .. } => "material_usage_recorded",
            Event::BatchCreated { .. } => "batch_created",
            Event::BatchStatusChanged { .. } => "batch_status_changed",
            Event::BatchShipped { .. } => "batch_shipped",
            Event::DeliveryReceived(_) => "delivery_received",
            Event::DeliveryRejected { .. } => "delivery_rejected",
            Event::NotificationDispatched { .. } => "notification_dispatched",
        }
    }
}

// Function to process incoming events. Events are informational; the
// durable record of every change lives in the database.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("events.processed", 1, "event" => event.name());

        match &event {
            Event::NotificationDispatched {
                notification_id,
                intent,
            } => {
                info!(
                    notification_id = %notification_id,
                    notification_type = %intent.notification_type,
                    target = ?intent.target,
                    "notification delivered in-process"
                );
            }
            Event::ProductionOrderDelayed { order_id, reason } => {
                warn!(order_id = %order_id, reason = %reason, "production order delayed");
            }
            other => {
                info!(event = other.name(), "Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed; event processing stopped");
}
