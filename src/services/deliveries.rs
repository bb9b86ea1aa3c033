use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::production_orders::{find_order, save_order, with_status};
use super::timeline::{self, TimelineEntry};
use super::{publish, require_text, Page};
use crate::{
    clock::SharedClock,
    domain::{delivery, DeliveryStatus, ProductionStatus},
    entities::warehouse_delivery::{self, Entity as DeliveryEntity},
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    notifications::builders,
};

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReceiveDelivery {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectDelivery {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub production_order_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Warehouse dashboard counters.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DeliveryStatistics {
    pub pending: u64,
    pub in_transit: u64,
    pub delivered_today: u64,
    /// Still pending past the expected date.
    pub delayed: u64,
    pub rejected: u64,
}

async fn find_delivery<C>(
    conn: &C,
    delivery_id: Uuid,
) -> Result<warehouse_delivery::Model, ServiceError>
where
    C: ConnectionTrait,
{
    DeliveryEntity::find_by_id(delivery_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", delivery_id)))
}

async fn count_for_order<C>(
    conn: &C,
    order_id: Uuid,
    statuses: Vec<DeliveryStatus>,
) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    DeliveryEntity::find()
        .filter(warehouse_delivery::Column::ProductionOrderId.eq(order_id))
        .filter(warehouse_delivery::Column::Status.is_in(statuses))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Moves an order in `shipped_to_warehouse` to `delivered` once nothing is
/// pending or in transit and at least one delivery arrived. Rejected
/// deliveries are ignored.
async fn complete_handoff<C>(
    conn: &C,
    changed: &warehouse_delivery::Model,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Event>, ServiceError>
where
    C: ConnectionTrait,
{
    let order = find_order(conn, changed.production_order_id).await?;
    if order.status != ProductionStatus::ShippedToWarehouse {
        return Ok(None);
    }

    let outstanding = count_for_order(
        conn,
        order.id,
        vec![DeliveryStatus::Pending, DeliveryStatus::InTransit],
    )
    .await?;
    let arrived = count_for_order(conn, order.id, vec![DeliveryStatus::Delivered]).await?;
    if outstanding > 0 || arrived == 0 {
        return Ok(None);
    }

    let delivered = save_order(
        conn,
        &order,
        with_status(&order, ProductionStatus::Delivered),
        Some(user_id),
        now,
    )
    .await?;
    timeline::append(
        conn,
        delivered.id,
        TimelineEntry::new(
            ProductionStatus::Delivered,
            format!("Warehouse hand-off closed by {}", changed.delivery_number),
            Some(user_id),
        ),
        now,
    )
    .await?;
    Ok(Some(Event::ProductionStatusChanged {
        order_id: delivered.id,
        old_status: order.status.to_string(),
        new_status: delivered.status.to_string(),
    }))
}

/// Warehouse side of the hand-off: dispatch, receipt and rejection.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    clock: SharedClock,
    event_sender: Option<EventSender>,
}

impl DeliveryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            clock,
            event_sender,
        }
    }

    /// Marks a pending delivery as on its way.
    #[instrument(skip(self))]
    pub async fn ship(
        &self,
        delivery_id: Uuid,
        user_id: Uuid,
    ) -> Result<warehouse_delivery::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let current = find_delivery(&txn, delivery_id).await?;
        let next = delivery::plan_ship(current.status)?;

        let mut active: warehouse_delivery::ActiveModel = current.into();
        active.status = Set(next);
        active.shipped_by = Set(Some(user_id));
        active.shipped_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(delivery_id = %updated.id, "Delivery in transit");
        Ok(updated)
    }

    /// Confirms receipt and closes the order's hand-off when this was the
    /// last delivery outstanding.
    #[instrument(skip(self, input))]
    pub async fn receive(
        &self,
        delivery_id: Uuid,
        input: ReceiveDelivery,
        user_id: Uuid,
    ) -> Result<warehouse_delivery::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let current = find_delivery(&txn, delivery_id).await?;
        let next = delivery::plan_receive(current.status)?;

        let mut active: warehouse_delivery::ActiveModel = current.clone().into();
        active.status = Set(next);
        active.actual_delivery_date = Set(Some(now.date_naive()));
        active.received_by = Set(Some(user_id));
        active.received_at = Set(Some(now));
        if let Some(notes) = input.notes.filter(|n| !n.trim().is_empty()) {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        outbox::enqueue(&txn, &builders::delivery_received(&updated), now).await?;

        let mut events = vec![Event::DeliveryReceived(updated.id)];

        if let Some(change) = complete_handoff(&txn, &updated, user_id, now).await? {
            events.push(change);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("warehouse.deliveries.received", 1);
        publish(&self.event_sender, events).await;
        info!(delivery_id = %updated.id, "Delivery received");
        Ok(updated)
    }

    /// Rejects a delivery. Rejecting the last outstanding delivery also
    /// closes the hand-off if others already arrived.
    #[instrument(skip(self, input))]
    pub async fn reject(
        &self,
        delivery_id: Uuid,
        input: RejectDelivery,
        user_id: Uuid,
    ) -> Result<warehouse_delivery::Model, ServiceError> {
        input.validate()?;
        require_text("reason", &input.reason)?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let current = find_delivery(&txn, delivery_id).await?;
        let next = delivery::plan_reject(current.status)?;

        let mut active: warehouse_delivery::ActiveModel = current.into();
        active.status = Set(next);
        active.rejection_reason = Set(Some(input.reason.clone()));
        active.received_by = Set(Some(user_id));
        active.received_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;
        outbox::enqueue(&txn, &builders::delivery_rejected(&updated), now).await?;

        let mut events = vec![Event::DeliveryRejected {
            delivery_id: updated.id,
            reason: input.reason,
        }];
        if let Some(change) = complete_handoff(&txn, &updated, user_id, now).await? {
            events.push(change);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("warehouse.deliveries.rejected", 1);
        publish(&self.event_sender, events).await;
        warn!(delivery_id = %updated.id, "Delivery rejected");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, delivery_id: Uuid) -> Result<warehouse_delivery::Model, ServiceError> {
        find_delivery(&*self.db, delivery_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: DeliveryFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<warehouse_delivery::Model>, ServiceError> {
        let page = page.max(1);
        let mut query = DeliveryEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(warehouse_delivery::Column::Status.eq(status));
        }
        if let Some(order_id) = filter.production_order_id {
            query = query.filter(warehouse_delivery::Column::ProductionOrderId.eq(order_id));
        }

        let paginator = query
            .order_by_asc(warehouse_delivery::Column::ExpectedDeliveryDate)
            .order_by_asc(warehouse_delivery::Column::DeliveryNumber)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<DeliveryStatistics, ServiceError> {
        let db = &*self.db;
        let today = self.clock.now().date_naive();
        let count_status = |status: DeliveryStatus| {
            DeliveryEntity::find()
                .filter(warehouse_delivery::Column::Status.eq(status))
                .count(db)
        };

        let pending = count_status(DeliveryStatus::Pending)
            .await
            .map_err(ServiceError::db_error)?;
        let in_transit = count_status(DeliveryStatus::InTransit)
            .await
            .map_err(ServiceError::db_error)?;
        let rejected = count_status(DeliveryStatus::Rejected)
            .await
            .map_err(ServiceError::db_error)?;
        let delivered_today = DeliveryEntity::find()
            .filter(warehouse_delivery::Column::Status.eq(DeliveryStatus::Delivered))
            .filter(warehouse_delivery::Column::ActualDeliveryDate.eq(today))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let delayed = DeliveryEntity::find()
            .filter(warehouse_delivery::Column::Status.eq(DeliveryStatus::Pending))
            .filter(warehouse_delivery::Column::ExpectedDeliveryDate.lt(today))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DeliveryStatistics {
            pending,
            in_transit,
            delivered_today,
            delayed,
            rejected,
        })
    }
}
