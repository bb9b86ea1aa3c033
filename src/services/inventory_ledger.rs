use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    clock::SharedClock,
    domain::{MaterialType, MovementDirection},
    entities::{
        material::{self, Entity as MaterialEntity},
        stock_movement::{self, Entity as StockMovementEntity},
    },
    errors::ServiceError,
    events::{outbox, Event, EventSender},
    notifications::builders,
};

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

/// Input for registering a stocked material.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewMaterial {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub material_type: MaterialType,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub initial_stock: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub min_stock: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub price_per_unit: Decimal,
    #[validate(length(max = 255))]
    pub supplier: Option<String>,
}

/// A manual credit or debit.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    #[validate(custom = "validate_positive")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub production_order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaterialFilter {
    pub material_type: Option<MaterialType>,
    pub active: Option<bool>,
    pub low_stock: Option<bool>,
}

/// Context a movement is recorded under.
#[derive(Debug, Clone)]
pub(crate) struct MovementContext {
    pub reason: String,
    pub user_id: Option<Uuid>,
    pub production_order_id: Option<Uuid>,
    pub now: DateTime<Utc>,
}

/// Result of a ledger write: the movement and the material after it.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry {
    pub movement: stock_movement::Model,
    pub material: material::Model,
}

impl LedgerEntry {
    pub fn event(&self) -> Event {
        match self.movement.direction {
            MovementDirection::Out => Event::StockDebited {
                material_id: self.material.id,
                quantity: self.movement.quantity,
                stock_after: self.movement.stock_after,
            },
            MovementDirection::In => Event::StockCredited {
                material_id: self.material.id,
                quantity: self.movement.quantity,
                stock_after: self.movement.stock_after,
            },
        }
    }
}

async fn find_material<C>(conn: &C, material_id: Uuid) -> Result<material::Model, ServiceError>
where
    C: ConnectionTrait,
{
    MaterialEntity::find_by_id(material_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", material_id)))
}

async fn record_movement<C>(
    conn: &C,
    material: &material::Model,
    direction: MovementDirection,
    quantity: Decimal,
    ctx: &MovementContext,
) -> Result<stock_movement::Model, ServiceError>
where
    C: ConnectionTrait,
{
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        material_id: Set(material.id),
        direction: Set(direction),
        quantity: Set(quantity),
        stock_after: Set(material.current_stock),
        reason: Set(ctx.reason.clone()),
        user_id: Set(ctx.user_id),
        production_order_id: Set(ctx.production_order_id),
        created_at: Set(ctx.now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Atomic check-and-decrement inside the caller's transaction.
///
/// The stock update only matches while `current_stock >= quantity`, so two
/// concurrent debits can never both pass a check that was valid for one.
/// Crossing the minimum stock enqueues a low-stock notification.
pub(crate) async fn debit_in_txn<C>(
    conn: &C,
    material_id: Uuid,
    quantity: Decimal,
    ctx: &MovementContext,
) -> Result<LedgerEntry, ServiceError>
where
    C: ConnectionTrait,
{
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Debit quantity must be positive, got: {}",
            quantity
        )));
    }

    let before = find_material(conn, material_id).await?;
    if !before.is_active {
        return Err(ServiceError::InvalidInput(format!(
            "Material {} is inactive",
            before.name
        )));
    }

    let result = MaterialEntity::update_many()
        .col_expr(
            material::Column::CurrentStock,
            Expr::col(material::Column::CurrentStock).sub(quantity),
        )
        .col_expr(material::Column::UpdatedAt, Expr::value(ctx.now))
        .filter(material::Column::Id.eq(material_id))
        .filter(material::Column::CurrentStock.gte(quantity))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        let current = find_material(conn, material_id).await?;
        return Err(ServiceError::InsufficientStock(format!(
            "{} requested {} {}, only {} available",
            current.name,
            quantity.normalize(),
            current.unit,
            current.current_stock.normalize()
        )));
    }

    let after = find_material(conn, material_id).await?;
    let movement = record_movement(conn, &after, MovementDirection::Out, quantity, ctx).await?;

    if !before.is_low_stock() && after.is_low_stock() {
        outbox::enqueue(conn, &builders::low_stock(&after), ctx.now).await?;
    }

    Ok(LedgerEntry {
        movement,
        material: after,
    })
}

/// Increment inside the caller's transaction. Only storage failures or a
/// missing material make it fail.
pub(crate) async fn credit_in_txn<C>(
    conn: &C,
    material_id: Uuid,
    quantity: Decimal,
    ctx: &MovementContext,
) -> Result<LedgerEntry, ServiceError>
where
    C: ConnectionTrait,
{
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Credit quantity must be positive, got: {}",
            quantity
        )));
    }

    let result = MaterialEntity::update_many()
        .col_expr(
            material::Column::CurrentStock,
            Expr::col(material::Column::CurrentStock).add(quantity),
        )
        .col_expr(material::Column::UpdatedAt, Expr::value(ctx.now))
        .filter(material::Column::Id.eq(material_id))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!(
            "Material {} not found",
            material_id
        )));
    }

    let after = find_material(conn, material_id).await?;
    let movement = record_movement(conn, &after, MovementDirection::In, quantity, ctx).await?;

    Ok(LedgerEntry {
        movement,
        material: after,
    })
}

/// Oldest active material of a type; the one production draws from.
pub(crate) async fn primary_material<C>(
    conn: &C,
    material_type: MaterialType,
) -> Result<Option<material::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    MaterialEntity::find()
        .filter(material::Column::MaterialType.eq(material_type))
        .filter(material::Column::IsActive.eq(true))
        .order_by_asc(material::Column::CreatedAt)
        .order_by_asc(material::Column::Id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Owns material stock levels and the append-only movement history.
#[derive(Clone)]
pub struct InventoryLedgerService {
    db: Arc<DatabaseConnection>,
    clock: SharedClock,
    event_sender: Option<EventSender>,
}

impl InventoryLedgerService {
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

    /// Registers a material. Initial stock is booked as an `in` movement so
    /// stock always equals the sum of its movements.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_material(
        &self,
        input: NewMaterial,
        user_id: Uuid,
    ) -> Result<material::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let created = material::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            material_type: Set(input.material_type),
            unit: Set(input.unit),
            current_stock: Set(Decimal::ZERO),
            min_stock: Set(input.min_stock),
            price_per_unit: Set(input.price_per_unit),
            supplier: Set(input.supplier),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let created = if input.initial_stock > Decimal::ZERO {
            let ctx = MovementContext {
                reason: "Initial stock".to_string(),
                user_id: Some(user_id),
                production_order_id: None,
                now,
            };
            credit_in_txn(&txn, created.id, input.initial_stock, &ctx)
                .await?
                .material
        } else {
            created
        };

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("inventory.materials.created", 1);
        super::publish(&self.event_sender, vec![Event::MaterialCreated(created.id)]).await;
        info!(material_id = %created.id, "Material created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_material(&self, material_id: Uuid) -> Result<material::Model, ServiceError> {
        find_material(&*self.db, material_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_materials(
        &self,
        filter: MaterialFilter,
    ) -> Result<Vec<material::Model>, ServiceError> {
        let mut query = MaterialEntity::find();
        if let Some(material_type) = filter.material_type {
            query = query.filter(material::Column::MaterialType.eq(material_type));
        }
        if let Some(active) = filter.active {
            query = query.filter(material::Column::IsActive.eq(active));
        }
        match filter.low_stock {
            Some(true) => {
                query = query.filter(
                    Expr::col(material::Column::CurrentStock)
                        .lte(Expr::col(material::Column::MinStock)),
                )
            }
            Some(false) => {
                query = query.filter(
                    Expr::col(material::Column::CurrentStock)
                        .gt(Expr::col(material::Column::MinStock)),
                )
            }
            None => {}
        }

        query
            .order_by_asc(material::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Movement history of a material, newest first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        material_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        find_material(&*self.db, material_id).await?;
        let mut query = StockMovementEntity::find()
            .filter(stock_movement::Column::MaterialId.eq(material_id))
            .order_by_desc(stock_movement::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query.all(&*self.db).await.map_err(ServiceError::db_error)
    }

    /// Soft delete; referenced history stays intact.
    #[instrument(skip(self))]
    pub async fn deactivate_material(
        &self,
        material_id: Uuid,
    ) -> Result<material::Model, ServiceError> {
        let now = self.clock.now();
        let material = find_material(&*self.db, material_id).await?;
        if !material.is_active {
            return Ok(material);
        }

        let mut active: material::ActiveModel = material.into();
        active.is_active = Set(false);
        active.updated_at = Set(now);
        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        super::publish(
            &self.event_sender,
            vec![Event::MaterialDeactivated(updated.id)],
        )
        .await;
        info!(material_id = %updated.id, "Material deactivated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn low_stock_materials(&self) -> Result<Vec<material::Model>, ServiceError> {
        self.list_materials(MaterialFilter {
            material_type: None,
            active: Some(true),
            low_stock: Some(true),
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn is_low_stock(&self, material_id: Uuid) -> Result<bool, ServiceError> {
        Ok(find_material(&*self.db, material_id).await?.is_low_stock())
    }

    #[instrument(skip(self, adjustment))]
    pub async fn credit(
        &self,
        material_id: Uuid,
        adjustment: StockAdjustment,
        user_id: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        adjustment.validate()?;
        let ctx = MovementContext {
            reason: adjustment.reason,
            user_id: Some(user_id),
            production_order_id: adjustment.production_order_id,
            now: self.clock.now(),
        };

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let entry = credit_in_txn(&txn, material_id, adjustment.quantity, &ctx).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("inventory.stock.credited", 1);
        super::publish(&self.event_sender, vec![entry.event()]).await;
        info!(
            material_id = %material_id,
            quantity = %entry.movement.quantity,
            stock_after = %entry.movement.stock_after,
            "Stock credited"
        );
        Ok(entry.movement)
    }

    #[instrument(skip(self, adjustment))]
    pub async fn debit(
        &self,
        material_id: Uuid,
        adjustment: StockAdjustment,
        user_id: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        adjustment.validate()?;
        let ctx = MovementContext {
            reason: adjustment.reason,
            user_id: Some(user_id),
            production_order_id: adjustment.production_order_id,
            now: self.clock.now(),
        };

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let entry = debit_in_txn(&txn, material_id, adjustment.quantity, &ctx).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("inventory.stock.debited", 1);
        super::publish(&self.event_sender, vec![entry.event()]).await;
        info!(
            material_id = %material_id,
            quantity = %entry.movement.quantity,
            stock_after = %entry.movement.stock_after,
            "Stock debited"
        );
        Ok(entry.movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn adjustment_requires_positive_quantity_and_reason() {
        let ok = StockAdjustment {
            quantity: dec!(1.5),
            reason: "cycle count".into(),
            production_order_id: None,
        };
        assert!(ok.validate().is_ok());

        let zero = StockAdjustment {
            quantity: Decimal::ZERO,
            ..ok.clone()
        };
        assert!(zero.validate().is_err());

        let blank = StockAdjustment {
            reason: String::new(),
            ..ok
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn negative_initial_stock_is_rejected() {
        let input = NewMaterial {
            name: "Profile-X".into(),
            material_type: MaterialType::Profile,
            unit: "m".into(),
            initial_stock: dec!(-1),
            min_stock: dec!(5),
            price_per_unit: dec!(12.5),
            supplier: None,
        };
        assert!(input.validate().is_err());
    }
}
