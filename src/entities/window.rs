use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::WindowLine;

/// Catalogue window product. Maintained by the catalogue module; production
/// only reads the dimensions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "windows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub width_mm: i32,
    pub height_mm: i32,
    pub price: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn line(&self, quantity: i32) -> WindowLine {
        WindowLine {
            width_mm: self.width_mm,
            height_mm: self.height_mm,
            quantity,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::production_order_item::Entity")]
    ProductionOrderItems,
}

impl Related<super::production_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionOrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
