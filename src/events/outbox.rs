//! Transactional notification outbox.
//!
//! [`enqueue`] writes a notification through the caller's transaction, so it
//! exists exactly when the business change it describes was committed. The
//! worker drains pending rows to a [`NotificationDispatcher`] with at-least-once
//! semantics and never touches business tables.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::Role;
use crate::clock::SharedClock;
use crate::entities::notification_outbox::{self, Entity as OutboxEntity, OutboxStatus};
use crate::errors::ServiceError;
use crate::notifications::{
    NotificationDispatcher, NotificationIntent, NotificationPriority, NotificationTarget,
    NotificationType,
};

const BASE_BACKOFF_SECS: i64 = 2;
const MAX_BACKOFF_SECS: i64 = 3_600;
/// How long a claimed row stays invisible to other workers.
const CLAIM_LEASE_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct OutboxWorkerConfig {
    pub poll_interval: std::time::Duration,
    pub batch_size: u64,
    pub max_attempts: i32,
}

impl Default for OutboxWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_millis(1_000),
            batch_size: 50,
            max_attempts: 8,
        }
    }
}

impl From<&crate::config::AppConfig> for OutboxWorkerConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self {
            poll_interval: cfg.outbox_poll_interval(),
            batch_size: cfg.outbox_batch_size,
            max_attempts: cfg.outbox_max_attempts,
        }
    }
}

/// Outcome of one poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
}

/// Enqueue a notification into the outbox. Call with the same transaction
/// as the write it describes.
pub async fn enqueue<C>(
    conn: &C,
    intent: &NotificationIntent,
    now: DateTime<Utc>,
) -> Result<Uuid, ServiceError>
where
    C: ConnectionTrait,
{
    let (target_role, target_user_id) = match intent.target {
        NotificationTarget::Role(role) => (Some(role.to_string()), None),
        NotificationTarget::User(user_id) => (None, Some(user_id)),
    };

    let id = Uuid::new_v4();
    notification_outbox::ActiveModel {
        id: Set(id),
        target_role: Set(target_role),
        target_user_id: Set(target_user_id),
        notification_type: Set(intent.notification_type.to_string()),
        title: Set(intent.title.clone()),
        message: Set(intent.message.clone()),
        data: Set(intent.data.clone()),
        priority: Set(intent.priority.to_string()),
        link: Set(intent.link.clone()),
        status: Set(OutboxStatus::Pending),
        attempts: Set(0),
        available_at: Set(now),
        last_error: Set(None),
        created_at: Set(now),
        processed_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    debug!(
        "enqueued outbox notification {} type={}",
        id, intent.notification_type
    );
    Ok(id)
}

/// Enqueue several notifications in order.
pub async fn enqueue_all<C>(
    conn: &C,
    intents: &[NotificationIntent],
    now: DateTime<Utc>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    for intent in intents {
        enqueue(conn, intent, now).await?;
    }
    Ok(())
}

/// Rebuilds the intent stored in an outbox row.
pub fn decode(row: &notification_outbox::Model) -> Result<NotificationIntent, String> {
    let target = match (&row.target_role, row.target_user_id) {
        (Some(role), _) => NotificationTarget::Role(
            Role::from_str(role).map_err(|_| format!("unknown role {}", role))?,
        ),
        (None, Some(user_id)) => NotificationTarget::User(user_id),
        (None, None) => return Err("notification has no target".to_string()),
    };
    let notification_type = NotificationType::from_str(&row.notification_type)
        .map_err(|_| format!("unknown notification type {}", row.notification_type))?;
    let priority = NotificationPriority::from_str(&row.priority)
        .map_err(|_| format!("unknown priority {}", row.priority))?;

    Ok(NotificationIntent {
        target,
        notification_type,
        title: row.title.clone(),
        message: row.message.clone(),
        data: row.data.clone(),
        priority,
        link: row.link.clone(),
    })
}

/// Delay before the next attempt, doubling per attempt and capped at an hour.
pub fn backoff(attempts: i32) -> Duration {
    let exponent = attempts.clamp(1, 20) as u32;
    Duration::seconds(
        BASE_BACKOFF_SECS
            .saturating_pow(exponent)
            .min(MAX_BACKOFF_SECS),
    )
}

/// Background worker to poll and dispatch outbox notifications.
pub fn start_worker(
    db: Arc<DatabaseConnection>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: SharedClock,
    config: OutboxWorkerConfig,
) -> JoinHandle<()> {
    info!(
        "Starting outbox worker (poll every {:?}, batch {})",
        config.poll_interval, config.batch_size
    );

    tokio::spawn(async move {
        loop {
            if let Err(e) = drain_once(&db, dispatcher.as_ref(), &clock, &config).await {
                error!("outbox worker error: {}", e);
            }
            tokio::time::sleep(config.poll_interval).await;
        }
    })
}

/// Dispatches every pending row that is due, oldest first.
pub async fn drain_once(
    db: &DatabaseConnection,
    dispatcher: &dyn NotificationDispatcher,
    clock: &SharedClock,
    config: &OutboxWorkerConfig,
) -> Result<DrainReport, ServiceError> {
    let now = clock.now();
    let due = OutboxEntity::find()
        .filter(notification_outbox::Column::Status.eq(OutboxStatus::Pending))
        .filter(notification_outbox::Column::AvailableAt.lte(now))
        .order_by_asc(notification_outbox::Column::CreatedAt)
        .limit(config.batch_size)
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;

    let mut report = DrainReport::default();

    for row in due {
        if !claim(db, &row, now).await? {
            debug!("outbox row {} claimed elsewhere", row.id);
            continue;
        }
        let attempts = row.attempts + 1;

        let outcome = match decode(&row) {
            Ok(intent) => dispatcher
                .dispatch(row.id, &intent)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                finish(db, row.id, OutboxStatus::Delivered, now, None, None).await?;
                counter!("outbox.delivered", 1);
                report.delivered += 1;
            }
            Err(reason) if attempts < config.max_attempts => {
                let retry_at = now + backoff(attempts);
                warn!(
                    "outbox row {} attempt {} failed, retrying at {}: {}",
                    row.id, attempts, retry_at, reason
                );
                finish(
                    db,
                    row.id,
                    OutboxStatus::Pending,
                    now,
                    Some(retry_at),
                    Some(reason),
                )
                .await?;
                counter!("outbox.retried", 1);
                report.retried += 1;
            }
            Err(reason) => {
                error!(
                    "outbox row {} failed permanently after {} attempts: {}",
                    row.id, attempts, reason
                );
                finish(db, row.id, OutboxStatus::Failed, now, None, Some(reason)).await?;
                counter!("outbox.failed", 1);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Conditional claim: bumps the attempt counter and leases the row only if
/// nobody else has touched it since it was read.
async fn claim(
    db: &DatabaseConnection,
    row: &notification_outbox::Model,
    now: DateTime<Utc>,
) -> Result<bool, ServiceError> {
    let result = OutboxEntity::update_many()
        .col_expr(
            notification_outbox::Column::Attempts,
            Expr::value(row.attempts + 1),
        )
        .col_expr(
            notification_outbox::Column::AvailableAt,
            Expr::value(now + Duration::seconds(CLAIM_LEASE_SECS)),
        )
        .filter(notification_outbox::Column::Id.eq(row.id))
        .filter(notification_outbox::Column::Status.eq(OutboxStatus::Pending))
        .filter(notification_outbox::Column::Attempts.eq(row.attempts))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(result.rows_affected == 1)
}

async fn finish(
    db: &DatabaseConnection,
    id: Uuid,
    status: OutboxStatus,
    now: DateTime<Utc>,
    retry_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
) -> Result<(), ServiceError> {
    let mut update = OutboxEntity::update_many()
        .col_expr(notification_outbox::Column::Status, Expr::value(status))
        .col_expr(
            notification_outbox::Column::LastError,
            Expr::value(last_error),
        )
        .filter(notification_outbox::Column::Id.eq(id));

    update = match retry_at {
        Some(at) => update.col_expr(notification_outbox::Column::AvailableAt, Expr::value(at)),
        None => update.col_expr(
            notification_outbox::Column::ProcessedAt,
            Expr::value(Some(now)),
        ),
    };

    update.exec(db).await.map_err(ServiceError::db_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff(1), Duration::seconds(2));
        assert_eq!(backoff(2), Duration::seconds(4));
        assert_eq!(backoff(5), Duration::seconds(32));
        assert_eq!(backoff(30), Duration::seconds(MAX_BACKOFF_SECS));
        assert_eq!(backoff(0), Duration::seconds(2));
    }

    #[test]
    fn decode_rejects_unknown_types() {
        let now = Utc::now();
        let row = notification_outbox::Model {
            id: Uuid::new_v4(),
            target_role: Some("warehouse".into()),
            target_user_id: None,
            notification_type: "carrier_pigeon".into(),
            title: "t".into(),
            message: "m".into(),
            data: serde_json::Value::Null,
            priority: "high".into(),
            link: None,
            status: OutboxStatus::Pending,
            attempts: 0,
            available_at: now,
            last_error: None,
            created_at: now,
            processed_at: None,
        };
        assert!(decode(&row).is_err());

        let row = notification_outbox::Model {
            notification_type: "low_stock".into(),
            ..row
        };
        let intent = decode(&row).unwrap();
        assert_eq!(intent.notification_type, NotificationType::LowStock);
        assert_eq!(intent.target, NotificationTarget::Role(Role::Warehouse));
    }
}
