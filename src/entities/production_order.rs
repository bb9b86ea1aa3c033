use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Priority, ProductionStatus, SourceType};

/// Aggregate root of the production lifecycle.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ProductionOrder)]
#[sea_orm(table_name = "production_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub source_type: SourceType,
    pub source_order_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub delivery_address: Option<String>,
    pub product_description: String,
    #[schema(value_type = Option<Object>)]
    pub specifications: Option<Json>,
    /// Sum of item quantities, fixed at creation.
    pub quantity: i32,
    pub status: ProductionStatus,
    /// Status to return to when leaving `on_hold`.
    pub held_from_status: Option<ProductionStatus>,
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub is_confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub is_delayed: bool,
    pub delay_reason: Option<String>,
    pub revised_completion_at: Option<DateTime<Utc>>,
    pub estimated_completion_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub production_time_hours: Option<i32>,
    pub estimated_warehouse_delivery_at: Option<DateTime<Utc>>,
    pub actual_completion_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::production_order_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::production_material::Entity")]
    Materials,
    #[sea_orm(has_many = "super::production_timeline::Entity")]
    Timeline,
    #[sea_orm(has_many = "super::production_batch::Entity")]
    Batches,
    #[sea_orm(has_many = "super::production_issue::Entity")]
    Issues,
    #[sea_orm(has_many = "super::warehouse_delivery::Entity")]
    Deliveries,
}

impl Related<super::production_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::production_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Materials.def()
    }
}

impl Related<super::production_timeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timeline.def()
    }
}

impl Related<super::production_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl Related<super::production_issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl Related<super::warehouse_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.version {
                self.version = ActiveValue::Set(1);
            }
            if let ActiveValue::NotSet = self.status {
                self.status = ActiveValue::Set(ProductionStatus::Pending);
            }
            if let ActiveValue::NotSet = self.priority {
                self.priority = ActiveValue::Set(Priority::Normal);
            }
        }

        Ok(self)
    }
}
