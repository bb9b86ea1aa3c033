use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::domain::ProductionStatus;
use crate::entities::production_timeline::{self, Entity as TimelineEntity};
use crate::errors::ServiceError;

/// A timeline row about to be written.
#[derive(Debug, Clone)]
pub(crate) struct TimelineEntry {
    pub status: ProductionStatus,
    pub notes: Option<String>,
    pub delay_reason: Option<String>,
    pub revised_completion_at: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
}

impl TimelineEntry {
    pub fn new(status: ProductionStatus, notes: impl Into<String>, user_id: Option<Uuid>) -> Self {
        Self {
            status,
            notes: Some(notes.into()),
            delay_reason: None,
            revised_completion_at: None,
            user_id,
        }
    }
}

/// Appends an entry after the last one recorded for the order.
pub(crate) async fn append<C>(
    conn: &C,
    production_order_id: Uuid,
    entry: TimelineEntry,
    now: DateTime<Utc>,
) -> Result<production_timeline::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let last = TimelineEntity::find()
        .filter(production_timeline::Column::ProductionOrderId.eq(production_order_id))
        .order_by_desc(production_timeline::Column::Sequence)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let sequence = last.map(|row| row.sequence + 1).unwrap_or(1);

    production_timeline::ActiveModel {
        id: Set(Uuid::new_v4()),
        production_order_id: Set(production_order_id),
        status: Set(entry.status),
        notes: Set(entry.notes),
        delay_reason: Set(entry.delay_reason),
        revised_completion_at: Set(entry.revised_completion_at),
        user_id: Set(entry.user_id),
        sequence: Set(sequence),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Full trail for an order, oldest first.
pub(crate) async fn for_order<C>(
    conn: &C,
    production_order_id: Uuid,
) -> Result<Vec<production_timeline::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    TimelineEntity::find()
        .filter(production_timeline::Column::ProductionOrderId.eq(production_order_id))
        .order_by_asc(production_timeline::Column::Sequence)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}
