use chrono::{DateTime, Datelike, Duration, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, Iterable, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::inventory_ledger::{
    credit_in_txn, debit_in_txn, primary_material, validate_non_negative, LedgerEntry,
    MovementContext,
};
use super::timeline::{self, TimelineEntry};
use super::{ensure_future, publish, require_text, Page};
use crate::{
    clock::SharedClock,
    config::{ConsumptionPolicy, ProductionConfig},
    db::sequence,
    domain::{
        numbering, production, schedule, BatchStatus, IssueImpact, IssueSeverity, IssueStatus,
        IssueType, MaterialRequirements, MaterialType, Priority, ProductionStatus, SourceType,
        WindowLine,
    },
    entities::{
        production_batch::{self, Entity as BatchEntity},
        production_issue::{self, Entity as IssueEntity},
        production_material::{self, Entity as ProductionMaterialEntity},
        production_order::{self, Entity as ProductionOrderEntity},
        production_order_item::{self, Entity as OrderItemEntity},
        production_timeline::{self, Entity as TimelineEntity},
        warehouse_delivery::{self, Entity as DeliveryEntity},
        window::{self, Entity as WindowEntity},
    },
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    notifications::builders,
};

fn default_source_type() -> SourceType {
    SourceType::CustomerOrder
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewOrderItem {
    pub window_id: Uuid,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
}

/// Input for creating a production order.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewProductionOrder {
    #[serde(default = "default_source_type")]
    pub source_type: SourceType,
    pub source_order_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub customer_name: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub product_description: String,
    #[schema(value_type = Option<Object>)]
    pub specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub estimated_completion_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConfirmOrder {
    pub estimated_completion_at: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReportDelay {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub revised_completion_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProgress {
    pub status: ProductionStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewIssue {
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    pub impact: IssueImpact,
    #[validate(range(min = 0))]
    pub estimated_delay_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct OrderUpdate {
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub estimated_completion_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 255))]
    pub customer_name: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordMaterialUsage {
    #[validate(custom = "validate_non_negative")]
    pub quantity_used: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub returned_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductionOrderFilter {
    pub status: Option<ProductionStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub is_delayed: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// An order with everything it owns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductionOrderDetails {
    pub order: production_order::Model,
    pub items: Vec<production_order_item::Model>,
    pub materials: Vec<production_material::Model>,
    pub timeline: Vec<production_timeline::Model>,
    pub batches: Vec<production_batch::Model>,
    pub issues: Vec<production_issue::Model>,
    pub deliveries: Vec<warehouse_delivery::Model>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ProductionStatistics {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub delayed: u64,
    pub on_hold: u64,
    pub open_critical_issues: u64,
}

pub(crate) async fn find_order<C>(
    conn: &C,
    order_id: Uuid,
) -> Result<production_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    ProductionOrderEntity::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Production order {} not found", order_id)))
}

/// Active model for a status change. Leaving `on_hold` forgets the status
/// the order was held from.
pub(crate) fn with_status(
    order: &production_order::Model,
    status: ProductionStatus,
) -> production_order::ActiveModel {
    let mut active: production_order::ActiveModel = order.clone().into();
    active.status = Set(status);
    if status != ProductionStatus::OnHold {
        active.held_from_status = Set(None);
    }
    active
}

/// Writes an order update guarded by the version that was read.
pub(crate) async fn save_order<C>(
    conn: &C,
    current: &production_order::Model,
    mut active: production_order::ActiveModel,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<production_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    active.version = Set(current.version + 1);
    active.updated_at = Set(now);
    if user_id.is_some() {
        active.updated_by = Set(user_id);
    }

    ProductionOrderEntity::update(active)
        .filter(production_order::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::ConcurrencyConflict(format!(
                "Production order {} was modified concurrently",
                current.order_number
            )),
            other => ServiceError::db_error(other),
        })
}

/// Moves a completed order to `shipped_to_warehouse` once at least one batch
/// left and none is still open. Rejected batches do not block.
pub(crate) async fn ship_order_if_complete<C>(
    conn: &C,
    order: production_order::Model,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<(production_order::Model, bool), ServiceError>
where
    C: ConnectionTrait,
{
    if order.status != ProductionStatus::Completed {
        return Ok((order, false));
    }

    let batches = BatchEntity::find()
        .filter(production_batch::Column::ProductionOrderId.eq(order.id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let any_shipped = batches.iter().any(|b| b.status == BatchStatus::Shipped);
    let any_open = batches.iter().any(|b| !b.status.is_final());
    if !any_shipped || any_open {
        return Ok((order, false));
    }

    let updated = save_order(
        conn,
        &order,
        with_status(&order, ProductionStatus::ShippedToWarehouse),
        user_id,
        now,
    )
    .await?;
    timeline::append(
        conn,
        updated.id,
        TimelineEntry::new(
            ProductionStatus::ShippedToWarehouse,
            "All batches shipped to warehouse",
            user_id,
        ),
        now,
    )
    .await?;
    Ok((updated, true))
}

async fn load_windows<C>(
    conn: &C,
    window_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, window::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let windows = WindowEntity::find()
        .filter(window::Column::Id.is_in(window_ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(windows.into_iter().map(|w| (w.id, w)).collect())
}

/// Resolves `(window_id, quantity)` pairs into calculator lines.
async fn window_lines<C>(
    conn: &C,
    items: &[(Uuid, i32)],
    require_active: bool,
) -> Result<Vec<WindowLine>, ServiceError>
where
    C: ConnectionTrait,
{
    let windows = load_windows(conn, items.iter().map(|(id, _)| *id).collect()).await?;
    items
        .iter()
        .map(|(window_id, quantity)| {
            let window = windows
                .get(window_id)
                .ok_or_else(|| ServiceError::NotFound(format!("Window {} not found", window_id)))?;
            if require_active && !window.is_active {
                return Err(ServiceError::InvalidInput(format!(
                    "Window {} is not available",
                    window.name
                )));
            }
            Ok(window.line(*quantity))
        })
        .collect()
}

async fn available_stock<C>(
    conn: &C,
    requirements: &MaterialRequirements,
) -> Result<BTreeMap<MaterialType, Decimal>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut available = BTreeMap::new();
    for (material_type, _) in requirements.iter() {
        if let Some(material) = primary_material(conn, material_type).await? {
            available.insert(material_type, material.current_stock);
        }
    }
    Ok(available)
}

/// Orchestrates the production order lifecycle.
#[derive(Clone)]
pub struct ProductionOrderService {
    db: Arc<DatabaseConnection>,
    clock: SharedClock,
    event_sender: Option<EventSender>,
    config: ProductionConfig,
}

impl ProductionOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        event_sender: Option<EventSender>,
        config: ProductionConfig,
    ) -> Self {
        Self {
            db,
            clock,
            event_sender,
            config,
        }
    }

    /// Creates a pending order after checking that current stock covers the
    /// material requirement of every line. Nothing is debited here.
    #[instrument(skip(self, input), fields(items = input.items.len()))]
    pub async fn create(
        &self,
        input: NewProductionOrder,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        input.validate()?;
        if input.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "A production order needs at least one item".to_string(),
            ));
        }
        let now = self.clock.now();
        if let Some(at) = input.estimated_completion_at {
            ensure_future("estimated_completion_at", at, now)?;
        }
        let quantity = input
            .items
            .iter()
            .try_fold(0i32, |total, item| total.checked_add(item.quantity))
            .ok_or_else(|| ServiceError::InvalidInput("Order quantity is too large".to_string()))?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let pairs: Vec<(Uuid, i32)> = input
            .items
            .iter()
            .map(|item| (item.window_id, item.quantity))
            .collect();
        let lines = window_lines(&txn, &pairs, true).await?;
        let requirements = MaterialRequirements::for_lines(&lines);
        let shortfalls = requirements.shortfalls(&available_stock(&txn, &requirements).await?);
        if !shortfalls.is_empty() {
            warn!(?shortfalls, "Rejecting production order: insufficient material");
            return Err(ServiceError::InsufficientMaterial(shortfalls));
        }

        let year = now.year();
        let seq = sequence::next_value(&txn, &numbering::order_scope(year)).await?;

        let order = production_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(numbering::order_number(year, seq)),
            source_type: Set(input.source_type),
            source_order_id: Set(input.source_order_id),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            delivery_address: Set(input.delivery_address),
            product_description: Set(input.product_description),
            specifications: Set(input.specifications),
            quantity: Set(quantity),
            status: Set(ProductionStatus::Pending),
            held_from_status: Set(None),
            priority: Set(input.priority),
            assigned_to: Set(input.assigned_to),
            is_confirmed: Set(false),
            confirmed_at: Set(None),
            confirmed_by: Set(None),
            is_delayed: Set(false),
            delay_reason: Set(None),
            revised_completion_at: Set(None),
            estimated_completion_at: Set(input.estimated_completion_at),
            started_at: Set(None),
            production_time_hours: Set(None),
            estimated_warehouse_delivery_at: Set(None),
            actual_completion_at: Set(None),
            notes: Set(input.notes),
            version: Set(1),
            created_by: Set(Some(user_id)),
            updated_by: Set(Some(user_id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        for item in &input.items {
            production_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                production_order_id: Set(order.id),
                window_id: Set(item.window_id),
                quantity: Set(item.quantity),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        timeline::append(
            &txn,
            order.id,
            TimelineEntry::new(
                ProductionStatus::Pending,
                "Production order created",
                Some(user_id),
            ),
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::new_production_order(&order), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.orders.created", 1);
        publish(
            &self.event_sender,
            vec![Event::ProductionOrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            }],
        )
        .await;
        info!(order_id = %order.id, order_number = %order.order_number, "Production order created");
        Ok(order)
    }

    /// Marks a pending order as confirmed with a future completion estimate.
    #[instrument(skip(self, input))]
    pub async fn confirm(
        &self,
        order_id: Uuid,
        input: ConfirmOrder,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        ensure_future("estimated_completion_at", input.estimated_completion_at, now)?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        if order.status != ProductionStatus::Pending {
            return Err(crate::domain::IllegalTransition::new(
                "production order",
                "confirm",
                order.status,
            )
            .into());
        }
        if order.is_confirmed {
            return Err(ServiceError::IllegalTransition(format!(
                "production order {} is already confirmed",
                order.order_number
            )));
        }

        let mut active: production_order::ActiveModel = order.clone().into();
        active.is_confirmed = Set(true);
        active.confirmed_at = Set(Some(now));
        active.confirmed_by = Set(Some(user_id));
        active.estimated_completion_at = Set(Some(input.estimated_completion_at));
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

        let notes = match input.notes {
            Some(notes) if !notes.trim().is_empty() => notes,
            _ => format!(
                "Order confirmed, estimated completion {}",
                input.estimated_completion_at.date_naive()
            ),
        };
        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(updated.status, notes, Some(user_id)),
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::order_confirmed(&updated), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionOrderConfirmed(updated.id)],
        )
        .await;
        info!(order_id = %updated.id, "Production order confirmed");
        Ok(updated)
    }

    /// Starts production: debits the required materials, records one
    /// reservation per debited material and schedules the warehouse hand-off.
    ///
    /// Under the strict policy any shortfall aborts the start with no stock
    /// touched. Under the lenient policy short materials are skipped and the
    /// skip is noted in the timeline.
    #[instrument(skip(self))]
    pub async fn start(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        let now = self.clock.now();
        let policy = self.config.consumption_policy;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        let target = production::plan_start(order.status)?;

        let items = order
            .find_related(OrderItemEntity)
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if items.is_empty() {
            return Err(ServiceError::InvalidInput(format!(
                "Production order {} has no items",
                order.order_number
            )));
        }
        let pairs: Vec<(Uuid, i32)> = items.iter().map(|i| (i.window_id, i.quantity)).collect();
        let requirements = MaterialRequirements::for_lines(&window_lines(&txn, &pairs, false).await?);

        let ctx = MovementContext {
            reason: format!("Production order {}", order.order_number),
            user_id: Some(user_id),
            production_order_id: Some(order.id),
            now,
        };
        let mut entries: Vec<LedgerEntry> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();

        for (material_type, required) in requirements.iter() {
            let Some(material) = primary_material(&txn, material_type).await? else {
                let msg = format!("no active {} material in stock", material_type);
                match policy {
                    ConsumptionPolicy::Strict => return Err(ServiceError::InsufficientStock(msg)),
                    ConsumptionPolicy::Lenient => {
                        warn!(order_id = %order.id, %material_type, "Skipping material: {}", msg);
                        skipped.push(msg);
                        continue;
                    }
                }
            };

            match debit_in_txn(&txn, material.id, required, &ctx).await {
                Ok(entry) => {
                    production_material::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        production_order_id: Set(order.id),
                        material_id: Set(material.id),
                        quantity_required: Set(required),
                        quantity_used: Set(Decimal::ZERO),
                        returned_quantity: Set(Decimal::ZERO),
                        reserved_at: Set(now),
                        used_at: Set(None),
                        created_at: Set(now),
                    }
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                    entries.push(entry);
                }
                Err(ServiceError::InsufficientStock(msg))
                    if policy == ConsumptionPolicy::Lenient =>
                {
                    warn!(order_id = %order.id, %material_type, "Skipping material: {}", msg);
                    skipped.push(msg);
                }
                Err(e) => return Err(e),
            }
        }

        let hours = schedule::estimate_production_hours(
            items.iter().map(|i| i.quantity),
            order.priority,
            self.config.hours_per_unit,
        );
        let production_time_hours = i32::try_from(hours).map_err(|_| {
            ServiceError::InvalidInput(format!("Production time of {} hours is too long", hours))
        })?;
        let ready_at = now + Duration::hours(hours);

        let mut active = with_status(&order, target);
        active.started_at = Set(Some(now));
        active.production_time_hours = Set(Some(production_time_hours));
        active.estimated_warehouse_delivery_at = Set(Some(ready_at));
        if order.estimated_completion_at.is_none() {
            active.estimated_completion_at = Set(Some(ready_at));
        }
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

        let mut notes = format!(
            "Production started, estimated {} hour(s)",
            production_time_hours
        );
        if !skipped.is_empty() {
            notes.push_str(&format!("; materials not consumed: {}", skipped.join("; ")));
        }
        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(target, notes, Some(user_id)),
            now,
        )
        .await?;

        outbox::enqueue(&txn, &builders::production_started(&updated), now).await?;
        if updated.estimated_warehouse_delivery_at.is_some() {
            outbox::enqueue(&txn, &builders::warehouse_delivery_scheduled(&updated), now).await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.orders.started", 1);
        histogram!("production.orders.estimated_hours", hours as f64);
        let mut events: Vec<Event> = entries.iter().map(LedgerEntry::event).collect();
        events.push(Event::ProductionStarted {
            order_id: updated.id,
            production_time_hours,
        });
        events.push(Event::ProductionStatusChanged {
            order_id: updated.id,
            old_status: order.status.to_string(),
            new_status: updated.status.to_string(),
        });
        publish(&self.event_sender, events).await;

        info!(
            order_id = %updated.id,
            materials = entries.len(),
            skipped = skipped.len(),
            hours = production_time_hours,
            "Production started"
        );
        Ok(updated)
    }

    /// Flags the order as delayed without changing its status.
    #[instrument(skip(self, input))]
    pub async fn report_delay(
        &self,
        order_id: Uuid,
        input: ReportDelay,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        input.validate()?;
        require_text("reason", &input.reason)?;
        let now = self.clock.now();
        ensure_future("revised_completion_at", input.revised_completion_at, now)?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        production::ensure_active(order.status, "report a delay on")?;

        let mut active: production_order::ActiveModel = order.clone().into();
        active.is_delayed = Set(true);
        active.delay_reason = Set(Some(input.reason.clone()));
        active.revised_completion_at = Set(Some(input.revised_completion_at));
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

        timeline::append(
            &txn,
            updated.id,
            TimelineEntry {
                status: updated.status,
                notes: Some("Delay reported".to_string()),
                delay_reason: Some(input.reason.clone()),
                revised_completion_at: Some(input.revised_completion_at),
                user_id: Some(user_id),
            },
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::order_delayed(&updated, &input.reason), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.orders.delayed", 1);
        publish(
            &self.event_sender,
            vec![Event::ProductionOrderDelayed {
                order_id: updated.id,
                reason: input.reason,
            }],
        )
        .await;
        info!(order_id = %updated.id, "Production delay reported");
        Ok(updated)
    }

    /// Forward-only status progress. Reaching `completed` stamps
    /// `actual_completion_at` the first time only.
    #[instrument(skip(self, input), fields(target = %input.status))]
    pub async fn update_progress(
        &self,
        order_id: Uuid,
        input: UpdateProgress,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        let next = production::plan_progress(order.status, input.status)?;
        let newly_completed = next == ProductionStatus::Completed
            && order.status != ProductionStatus::Completed;

        let mut active = with_status(&order, next);
        if next == ProductionStatus::Completed && order.actual_completion_at.is_none() {
            active.actual_completion_at = Set(Some(now));
        }
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

        let notes = match input.notes {
            Some(notes) if !notes.trim().is_empty() => notes,
            _ if order.status == next => format!("Progress noted in {}", next),
            _ => format!("Status changed from {} to {}", order.status, next),
        };
        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(next, notes, Some(user_id)),
            now,
        )
        .await?;

        outbox::enqueue(&txn, &builders::order_updated(&updated), now).await?;
        if newly_completed {
            outbox::enqueue(&txn, &builders::production_completed(&updated), now).await?;
        }

        let (updated, shipped) =
            ship_order_if_complete(&txn, updated, Some(user_id), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        if newly_completed {
            counter!("production.orders.completed", 1);
        }
        let mut events = vec![Event::ProductionStatusChanged {
            order_id: updated.id,
            old_status: order.status.to_string(),
            new_status: next.to_string(),
        }];
        if shipped {
            events.push(Event::ProductionStatusChanged {
                order_id: updated.id,
                old_status: next.to_string(),
                new_status: updated.status.to_string(),
            });
        }
        publish(&self.event_sender, events).await;
        info!(order_id = %updated.id, status = %updated.status, "Production progress updated");
        Ok(updated)
    }

    /// Records an issue. A critical issue puts the order on hold in the same
    /// transaction.
    #[instrument(skip(self, input), fields(severity = %input.severity))]
    pub async fn report_issue(
        &self,
        order_id: Uuid,
        input: NewIssue,
        user_id: Uuid,
    ) -> Result<production_issue::Model, ServiceError> {
        input.validate()?;
        require_text("description", &input.description)?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        production::ensure_active(order.status, "report an issue on")?;

        let issue = production_issue::ActiveModel {
            id: Set(Uuid::new_v4()),
            production_order_id: Set(order.id),
            issue_type: Set(input.issue_type),
            severity: Set(input.severity),
            description: Set(input.description),
            impact: Set(input.impact),
            estimated_delay_hours: Set(input.estimated_delay_hours),
            status: Set(IssueStatus::Open),
            reported_by: Set(Some(user_id)),
            resolved_by: Set(None),
            resolved_at: Set(None),
            resolution_notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        outbox::enqueue(&txn, &builders::issue_reported(&order, &issue), now).await?;

        let mut events = vec![Event::ProductionIssueReported {
            order_id: order.id,
            issue_id: issue.id,
            severity: issue.severity.to_string(),
        }];

        if issue.severity == IssueSeverity::Critical && order.status != ProductionStatus::OnHold {
            let held = production::plan_hold(order.status)?;
            let mut active = with_status(&order, held);
            active.held_from_status = Set(Some(order.status));
            let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

            timeline::append(
                &txn,
                updated.id,
                TimelineEntry::new(
                    held,
                    format!("Order on hold due to critical issue: {}", issue.description),
                    Some(user_id),
                ),
                now,
            )
            .await?;
            outbox::enqueue(&txn, &builders::order_on_hold(&updated, &issue), now).await?;

            events.push(Event::ProductionStatusChanged {
                order_id: updated.id,
                old_status: order.status.to_string(),
                new_status: held.to_string(),
            });
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.issues.reported", 1);
        publish(&self.event_sender, events).await;
        info!(order_id = %order.id, issue_id = %issue.id, "Production issue reported");
        Ok(issue)
    }

    /// Puts an active order on hold, remembering where it was.
    #[instrument(skip(self))]
    pub async fn hold(
        &self,
        order_id: Uuid,
        reason: String,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        require_text("reason", &reason)?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        let held = production::plan_hold(order.status)?;
        let mut active = with_status(&order, held);
        active.held_from_status = Set(Some(order.status));
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;

        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(held, format!("Put on hold: {}", reason), Some(user_id)),
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::order_updated(&updated), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionStatusChanged {
                order_id: updated.id,
                old_status: order.status.to_string(),
                new_status: held.to_string(),
            }],
        )
        .await;
        info!(order_id = %updated.id, from = %order.status, "Production order put on hold");
        Ok(updated)
    }

    /// Returns a held order to the status it was held from.
    #[instrument(skip(self))]
    pub async fn resume(
        &self,
        order_id: Uuid,
        notes: Option<String>,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        let target = production::plan_resume(order.status, order.held_from_status)?;
        let updated = save_order(&txn, &order, with_status(&order, target), Some(user_id), now)
            .await?;

        let notes = notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Resumed into {}", target));
        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(target, notes, Some(user_id)),
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::order_updated(&updated), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionStatusChanged {
                order_id: updated.id,
                old_status: order.status.to_string(),
                new_status: target.to_string(),
            }],
        )
        .await;
        info!(order_id = %updated.id, status = %target, "Production order resumed");
        Ok(updated)
    }

    /// Cancels a pending order, or any cancellable order with an
    /// administrator override. Debited material is not returned.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        order_id: Uuid,
        reason: String,
        admin_override: bool,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        require_text("reason", &reason)?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        let cancelled = production::plan_cancel(order.status, admin_override)?;
        let updated = save_order(&txn, &order, with_status(&order, cancelled), Some(user_id), now)
            .await?;

        timeline::append(
            &txn,
            updated.id,
            TimelineEntry::new(cancelled, format!("Cancelled: {}", reason), Some(user_id)),
            now,
        )
        .await?;
        outbox::enqueue(&txn, &builders::order_cancelled(&updated, &reason), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("production.orders.cancelled", 1);
        publish(
            &self.event_sender,
            vec![Event::ProductionOrderCancelled(updated.id)],
        )
        .await;
        info!(order_id = %updated.id, admin_override, "Production order cancelled");
        Ok(updated)
    }

    /// Hard-deletes a pending order together with everything it owns.
    #[instrument(skip(self))]
    pub async fn delete(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        production::ensure_deletable(order.status)?;

        OrderItemEntity::delete_many()
            .filter(production_order_item::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        ProductionMaterialEntity::delete_many()
            .filter(production_material::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        TimelineEntity::delete_many()
            .filter(production_timeline::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        IssueEntity::delete_many()
            .filter(production_issue::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        DeliveryEntity::delete_many()
            .filter(warehouse_delivery::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        BatchEntity::delete_many()
            .filter(production_batch::Column::ProductionOrderId.eq(order.id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        ProductionOrderEntity::delete_by_id(order.id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionOrderDeleted(order.id)],
        )
        .await;
        info!(order_id = %order.id, order_number = %order.order_number, "Production order deleted");
        Ok(())
    }

    /// Edits descriptive fields. Quantity and items never change here.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        order_id: Uuid,
        input: OrderUpdate,
        user_id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        if let Some(at) = input.estimated_completion_at {
            ensure_future("estimated_completion_at", at, now)?;
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let order = find_order(&txn, order_id).await?;
        if order.status.is_terminal() {
            return Err(
                crate::domain::IllegalTransition::new("production order", "update", order.status)
                    .into(),
            );
        }

        let mut active: production_order::ActiveModel = order.clone().into();
        if let Some(priority) = input.priority {
            active.priority = Set(priority);
        }
        if let Some(assigned_to) = input.assigned_to {
            active.assigned_to = Set(Some(assigned_to));
        }
        if let Some(at) = input.estimated_completion_at {
            active.estimated_completion_at = Set(Some(at));
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(name) = input.customer_name {
            active.customer_name = Set(Some(name));
        }
        if let Some(email) = input.customer_email {
            active.customer_email = Set(Some(email));
        }
        if let Some(address) = input.delivery_address {
            active.delivery_address = Set(Some(address));
        }
        let updated = save_order(&txn, &order, active, Some(user_id), now).await?;
        outbox::enqueue(&txn, &builders::order_updated(&updated), now).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionOrderUpdated(updated.id)],
        )
        .await;
        info!(order_id = %updated.id, "Production order updated");
        Ok(updated)
    }

    /// Applies usage figures to a reservation. Newly returned material is
    /// credited back; usage beyond the waste margin is only logged.
    #[instrument(skip(self, input))]
    pub async fn record_material_usage(
        &self,
        order_id: Uuid,
        production_material_id: Uuid,
        input: RecordMaterialUsage,
        user_id: Uuid,
    ) -> Result<production_material::Model, ServiceError> {
        input.validate()?;
        if input.quantity_used.is_none() && input.returned_quantity.is_none() {
            return Err(ServiceError::InvalidInput(
                "Provide quantity_used or returned_quantity".to_string(),
            ));
        }
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, order_id).await?;
        match order.status {
            ProductionStatus::InProgress
            | ProductionStatus::QualityCheck
            | ProductionStatus::Completed
            | ProductionStatus::OnHold => {}
            other => {
                return Err(crate::domain::IllegalTransition::new(
                    "production order",
                    "record material usage for",
                    other,
                )
                .into())
            }
        }

        let reservation = ProductionMaterialEntity::find_by_id(production_material_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|pm| pm.production_order_id == order.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Material reservation {} not found on order {}",
                    production_material_id, order.order_number
                ))
            })?;

        let used = input.quantity_used.unwrap_or(reservation.quantity_used);
        let returned = input
            .returned_quantity
            .unwrap_or(reservation.returned_quantity);
        if returned < reservation.returned_quantity {
            return Err(ServiceError::InvalidInput(format!(
                "Returned quantity cannot decrease from {}",
                reservation.returned_quantity.normalize()
            )));
        }
        if returned > reservation.quantity_required {
            return Err(ServiceError::InvalidInput(format!(
                "Cannot return {} when only {} was reserved",
                returned.normalize(),
                reservation.quantity_required.normalize()
            )));
        }

        let limit = reservation.quantity_required * (Decimal::ONE + self.config.waste_margin());
        if used > limit {
            warn!(
                order_id = %order.id,
                material_id = %reservation.material_id,
                used = %used,
                required = %reservation.quantity_required,
                "Material usage exceeds waste margin"
            );
        }

        let mut events = Vec::new();
        let newly_returned = returned - reservation.returned_quantity;
        if newly_returned > Decimal::ZERO {
            let ctx = MovementContext {
                reason: format!("Returned from production order {}", order.order_number),
                user_id: Some(user_id),
                production_order_id: Some(order.id),
                now,
            };
            let entry =
                credit_in_txn(&txn, reservation.material_id, newly_returned, &ctx).await?;
            events.push(entry.event());
        }

        let mut active: production_material::ActiveModel = reservation.clone().into();
        active.quantity_used = Set(used);
        active.returned_quantity = Set(returned);
        if input.quantity_used.is_some() {
            active.used_at = Set(Some(now));
        }
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        events.push(Event::MaterialUsageRecorded {
            order_id: order.id,
            material_id: updated.material_id,
            quantity_used: updated.quantity_used,
        });
        publish(&self.event_sender, events).await;
        info!(order_id = %order.id, reservation_id = %updated.id, "Material usage recorded");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: Uuid) -> Result<production_order::Model, ServiceError> {
        find_order(&*self.db, order_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_details(
        &self,
        order_id: Uuid,
    ) -> Result<ProductionOrderDetails, ServiceError> {
        let db = &*self.db;
        let order = find_order(db, order_id).await?;

        let items = order
            .find_related(OrderItemEntity)
            .order_by_asc(production_order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let materials = order
            .find_related(ProductionMaterialEntity)
            .order_by_asc(production_material::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let timeline = timeline::for_order(db, order.id).await?;
        let batches = order
            .find_related(BatchEntity)
            .order_by_asc(production_batch::Column::BatchNumber)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let issues = order
            .find_related(IssueEntity)
            .order_by_desc(production_issue::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let deliveries = order
            .find_related(DeliveryEntity)
            .order_by_asc(warehouse_delivery::Column::DeliveryNumber)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ProductionOrderDetails {
            order,
            items,
            materials,
            timeline,
            batches,
            issues,
            deliveries,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductionOrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<production_order::Model>, ServiceError> {
        let page = page.max(1);
        let mut query = ProductionOrderEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(production_order::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(production_order::Column::Priority.eq(priority));
        }
        if let Some(assigned_to) = filter.assigned_to {
            query = query.filter(production_order::Column::AssignedTo.eq(assigned_to));
        }
        if let Some(is_delayed) = filter.is_delayed {
            query = query.filter(production_order::Column::IsDelayed.eq(is_delayed));
        }

        let paginator = query
            .order_by_desc(production_order::Column::CreatedAt)
            .order_by_desc(production_order::Column::OrderNumber)
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
    pub async fn timeline(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<production_timeline::Model>, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        timeline::for_order(&*self.db, order.id).await
    }

    #[instrument(skip(self))]
    pub async fn materials(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<production_material::Model>, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        order
            .find_related(ProductionMaterialEntity)
            .order_by_asc(production_material::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<ProductionStatistics, ServiceError> {
        let db = &*self.db;
        let mut stats = ProductionStatistics::default();

        for status in ProductionStatus::iter() {
            let count = ProductionOrderEntity::find()
                .filter(production_order::Column::Status.eq(status))
                .count(db)
                .await
                .map_err(ServiceError::db_error)?;
            stats.total += count;
            if status == ProductionStatus::OnHold {
                stats.on_hold = count;
            }
            stats.by_status.insert(status.to_string(), count);
        }

        stats.delayed = ProductionOrderEntity::find()
            .filter(production_order::Column::IsDelayed.eq(true))
            .filter(
                production_order::Column::Status
                    .is_not_in([ProductionStatus::Delivered, ProductionStatus::Cancelled]),
            )
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        stats.open_critical_issues = IssueEntity::find()
            .filter(production_issue::Column::Severity.eq(IssueSeverity::Critical))
            .filter(
                production_issue::Column::Status
                    .is_not_in([IssueStatus::Resolved, IssueStatus::Cancelled]),
            )
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_items_are_validated() {
        let order = NewProductionOrder {
            source_type: SourceType::CustomerOrder,
            source_order_id: None,
            customer_name: Some("Kowalski".into()),
            customer_email: Some("not-an-email".into()),
            delivery_address: None,
            product_description: "Casement windows".into(),
            specifications: None,
            priority: Priority::Normal,
            assigned_to: None,
            estimated_completion_at: None,
            notes: None,
            items: vec![NewOrderItem {
                window_id: Uuid::new_v4(),
                quantity: 0,
            }],
        };
        let errors = order.validate().unwrap_err();
        let rendered = errors.to_string();
        assert!(rendered.contains("customer_email"), "{rendered}");
        assert!(rendered.contains("quantity"), "{rendered}");
    }

    #[test]
    fn leaving_hold_forgets_previous_status() {
        let now = Utc::now();
        let order = production_order::Model {
            id: Uuid::new_v4(),
            order_number: "PRD-2026-0001".into(),
            source_type: SourceType::StockReplenishment,
            source_order_id: None,
            customer_name: None,
            customer_email: None,
            delivery_address: None,
            product_description: "Fixed lights".into(),
            specifications: None,
            quantity: 2,
            status: ProductionStatus::OnHold,
            held_from_status: Some(ProductionStatus::InProgress),
            priority: Priority::Normal,
            assigned_to: None,
            is_confirmed: false,
            confirmed_at: None,
            confirmed_by: None,
            is_delayed: false,
            delay_reason: None,
            revised_completion_at: None,
            estimated_completion_at: None,
            started_at: None,
            production_time_hours: None,
            estimated_warehouse_delivery_at: None,
            actual_completion_at: None,
            notes: None,
            version: 3,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        let active = with_status(&order, ProductionStatus::InProgress);
        assert_eq!(active.held_from_status, Set(None));
        assert_eq!(active.status, Set(ProductionStatus::InProgress));
    }
}
