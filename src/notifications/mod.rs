//! Notifications produced by the production lifecycle.
//!
//! Services never deliver notifications themselves. They build a
//! [`NotificationIntent`] and append it to the outbox inside their
//! transaction; the outbox worker hands stored intents to a
//! [`NotificationDispatcher`].

pub mod builders;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::Role;
use crate::config::DispatcherKind;
use crate::events::{Event, EventSender};

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unknown notification type: {0}")]
    UnknownType(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Types of notifications
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    NewProductionOrder,
    ProductionOrderConfirmed,
    ProductionStarted,
    WarehouseDeliveryScheduled,
    ProductionOrderDelayed,
    ProductionOrderUpdated,
    ProductionCompleted,
    ProductionIssueReported,
    ProductionOrderOnHold,
    ProductionOrderCancelled,
    WarehouseDeliveryIncoming,
    DeliveryReceived,
    DeliveryRejected,
    LowStock,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// Who should see a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    Role(Role),
    User(Uuid),
}

/// A notification waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub target: NotificationTarget,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: Value,
    pub priority: NotificationPriority,
    pub link: Option<String>,
}

impl NotificationIntent {
    pub fn for_role(
        role: Role,
        notification_type: NotificationType,
        priority: NotificationPriority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            target: NotificationTarget::Role(role),
            notification_type,
            title: title.into(),
            message: message.into(),
            data: Value::Null,
            priority,
            link: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Delivers stored notifications. Failures are retried by the outbox worker.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, id: Uuid, intent: &NotificationIntent)
        -> Result<(), NotificationError>;
}

/// Writes each notification as a structured log line.
#[derive(Debug, Default, Clone)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(
        &self,
        id: Uuid,
        intent: &NotificationIntent,
    ) -> Result<(), NotificationError> {
        info!(
            notification_id = %id,
            notification_type = %intent.notification_type,
            priority = %intent.priority,
            target = ?intent.target,
            title = %intent.title,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Forwards notifications into the in-process event channel.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl NotificationDispatcher for EventDispatcher {
    async fn dispatch(
        &self,
        id: Uuid,
        intent: &NotificationIntent,
    ) -> Result<(), NotificationError> {
        self.sender
            .send(Event::NotificationDispatched {
                notification_id: id,
                intent: intent.clone(),
            })
            .await
            .map_err(NotificationError::Delivery)
    }
}

/// Builds the dispatcher selected by `notification_dispatcher`.
pub fn dispatcher_for(
    kind: DispatcherKind,
    sender: EventSender,
) -> Arc<dyn NotificationDispatcher> {
    match kind {
        DispatcherKind::Events => Arc::new(EventDispatcher::new(sender)),
        DispatcherKind::Log => Arc::new(LoggingDispatcher),
    }
}
