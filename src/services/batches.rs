use chrono::{Datelike, Duration, NaiveDate};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::production_orders::{find_order, ship_order_if_complete};
use super::publish;
use super::timeline::{self, TimelineEntry};
use crate::{
    clock::SharedClock,
    db::sequence,
    domain::{batch, numbering, production, BatchStatus, DeliveryStatus},
    entities::{
        production_batch::{self, Entity as BatchEntity},
        production_order,
        warehouse_delivery,
    },
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    notifications::builders,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBatch {
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    #[validate(length(max = 2000))]
    pub quality_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BatchUpdate {
    pub status: BatchStatus,
    pub quality_check_passed: Option<bool>,
    #[validate(length(max = 2000))]
    pub quality_notes: Option<String>,
}

/// Hands one ready batch to the warehouse.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ShipToWarehouse {
    pub batch_id: Uuid,
    pub expected_delivery_date: Option<NaiveDate>,
    /// Free-form manifest; defaults to the batch number and quantity.
    #[schema(value_type = Option<Object>)]
    pub items: Option<serde_json::Value>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Result of a warehouse hand-off.
#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct Shipment {
    pub batch: production_batch::Model,
    pub delivery: warehouse_delivery::Model,
    pub order: production_order::Model,
}

async fn find_batch<C>(conn: &C, batch_id: Uuid) -> Result<production_batch::Model, ServiceError>
where
    C: ConnectionTrait,
{
    BatchEntity::find_by_id(batch_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
}

/// Splits production orders into batches and ships them to the warehouse.
#[derive(Clone)]
pub struct BatchService {
    db: Arc<DatabaseConnection>,
    clock: SharedClock,
    event_sender: Option<EventSender>,
}

impl BatchService {
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

    /// Opens a batch. Batch quantities of an order, rejected batches
    /// included, never exceed the order quantity.
    #[instrument(skip(self, input), fields(quantity = input.quantity))]
    pub async fn create_batch(
        &self,
        order_id: Uuid,
        input: NewBatch,
        user_id: Uuid,
    ) -> Result<production_batch::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        production::ensure_accepts_batches(order.status)?;

        // Taking the sequence first serializes batch creation per order.
        let seq = sequence::next_value(&txn, &numbering::batch_scope(order.id)).await?;

        let existing = BatchEntity::find()
            .filter(production_batch::Column::ProductionOrderId.eq(order.id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let batched: i64 = existing.iter().map(|b| i64::from(b.quantity)).sum();
        let remaining = i64::from(order.quantity) - batched;
        if i64::from(input.quantity) > remaining {
            return Err(ServiceError::InvalidInput(format!(
                "Batch of {} exceeds the {} unit(s) of order {} not yet batched",
                input.quantity,
                remaining.max(0),
                order.order_number
            )));
        }

        let batch = production_batch::ActiveModel {
            id: Set(Uuid::new_v4()),
            production_order_id: Set(order.id),
            batch_number: Set(numbering::batch_number(&order.order_number, seq)),
            quantity: Set(input.quantity),
            status: Set(BatchStatus::InProduction),
            quality_check_passed: Set(None),
            quality_notes: Set(input.quality_notes),
            started_at: Set(now),
            completed_at: Set(None),
            shipped_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        timeline::append(
            &txn,
            order.id,
            TimelineEntry::new(
                order.status,
                format!(
                    "Batch {} opened with {} unit(s)",
                    batch.batch_number, batch.quantity
                ),
                Some(user_id),
            ),
            now,
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.batches.created", 1);
        publish(
            &self.event_sender,
            vec![Event::BatchCreated {
                order_id: order.id,
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
            }],
        )
        .await;
        info!(batch_id = %batch.id, batch_number = %batch.batch_number, "Batch created");
        Ok(batch)
    }

    #[instrument(skip(self, input), fields(target = %input.status))]
    pub async fn update_status(
        &self,
        batch_id: Uuid,
        input: BatchUpdate,
    ) -> Result<production_batch::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let current = find_batch(&txn, batch_id).await?;
        let next = batch::plan_update(current.status, input.status)?;

        let mut active: production_batch::ActiveModel = current.clone().into();
        active.status = Set(next);
        if let Some(passed) = input.quality_check_passed {
            active.quality_check_passed = Set(Some(passed));
        }
        if let Some(notes) = input.quality_notes {
            active.quality_notes = Set(Some(notes));
        }
        if next == BatchStatus::Ready && current.completed_at.is_none() {
            active.completed_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::BatchStatusChanged {
                batch_id: updated.id,
                status: updated.status.to_string(),
            }],
        )
        .await;
        info!(batch_id = %updated.id, from = %current.status, to = %updated.status, "Batch status updated");
        Ok(updated)
    }

    /// Ships a ready batch: creates a pending warehouse delivery, marks the
    /// batch shipped and, when it was the last open batch of a completed
    /// order, moves the order to `shipped_to_warehouse`.
    #[instrument(skip(self, input), fields(batch_id = %input.batch_id))]
    pub async fn ship_to_warehouse(
        &self,
        order_id: Uuid,
        input: ShipToWarehouse,
        user_id: Uuid,
    ) -> Result<Shipment, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let today = now.date_naive();
        if let Some(date) = input.expected_delivery_date {
            if date < today {
                return Err(ServiceError::ValidationError(
                    "expected_delivery_date cannot be in the past".to_string(),
                ));
            }
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        production::ensure_can_ship_batches(order.status)?;

        let current = find_batch(&txn, input.batch_id).await?;
        if current.production_order_id != order.id {
            return Err(ServiceError::NotFound(format!(
                "Batch {} not found on order {}",
                input.batch_id, order.order_number
            )));
        }
        batch::ensure_shippable(current.status)?;

        let year = now.year();
        let seq = sequence::next_value(&txn, &numbering::delivery_scope(year)).await?;
        let expected = input.expected_delivery_date.unwrap_or_else(|| {
            order
                .estimated_warehouse_delivery_at
                .map(|at| at.date_naive())
                .unwrap_or(today + Duration::days(1))
        });
        let items = input.items.unwrap_or_else(|| {
            json!([{ "batch_number": current.batch_number, "quantity": current.quantity }])
        });

        let delivery = warehouse_delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            delivery_number: Set(numbering::delivery_number(year, seq)),
            production_order_id: Set(order.id),
            production_batch_id: Set(Some(current.id)),
            status: Set(DeliveryStatus::Pending),
            expected_delivery_date: Set(expected),
            actual_delivery_date: Set(None),
            items: Set(items),
            notes: Set(input.notes),
            rejection_reason: Set(None),
            shipped_by: Set(None),
            shipped_at: Set(None),
            received_by: Set(None),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut active: production_batch::ActiveModel = current.clone().into();
        active.status = Set(BatchStatus::Shipped);
        active.shipped_at = Set(Some(now));
        active.updated_at = Set(now);
        let shipped = active.update(&txn).await.map_err(ServiceError::db_error)?;

        timeline::append(
            &txn,
            order.id,
            TimelineEntry::new(
                order.status,
                format!(
                    "Batch {} shipped to warehouse as {}",
                    shipped.batch_number, delivery.delivery_number
                ),
                Some(user_id),
            ),
            now,
        )
        .await?;
        outbox::enqueue(
            &txn,
            &builders::delivery_incoming(&order, &shipped, &delivery),
            now,
        )
        .await?;

        let previous_status = order.status;
        let (order, order_shipped) = ship_order_if_complete(&txn, order, Some(user_id), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.batches.shipped", 1);
        let mut events = vec![Event::BatchShipped {
            batch_id: shipped.id,
            delivery_id: delivery.id,
            expected_delivery_date: delivery.expected_delivery_date,
        }];
        if order_shipped {
            events.push(Event::ProductionStatusChanged {
                order_id: order.id,
                old_status: previous_status.to_string(),
                new_status: order.status.to_string(),
            });
        }
        publish(&self.event_sender, events).await;
        info!(
            batch_id = %shipped.id,
            delivery_number = %delivery.delivery_number,
            "Batch shipped to warehouse"
        );

        Ok(Shipment {
            batch: shipped,
            delivery,
            order,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, batch_id: Uuid) -> Result<production_batch::Model, ServiceError> {
        find_batch(&*self.db, batch_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<production_batch::Model>, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        BatchEntity::find()
            .filter(production_batch::Column::ProductionOrderId.eq(order.id))
            .order_by_asc(production_batch::Column::BatchNumber)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }
}
