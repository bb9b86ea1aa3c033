use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::IllegalTransition;

const ENTITY: &str = "batch";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
    #[sea_orm(string_value = "in_production")]
    InProduction,
    #[sea_orm(string_value = "quality_check")]
    QualityCheck,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl BatchStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Shipped | Self::Rejected)
    }
}

/// Manual status updates. `shipped` is reserved for the ship-to-warehouse
/// operation, and shipped or rejected batches no longer change.
pub fn plan_update(current: BatchStatus, target: BatchStatus) -> Result<BatchStatus, IllegalTransition> {
    if current.is_final() {
        return Err(IllegalTransition::new(
            ENTITY,
            format!("move to {}", target),
            current,
        ));
    }
    if target == BatchStatus::Shipped {
        return Err(IllegalTransition::new(
            ENTITY,
            "mark as shipped without a warehouse delivery",
            current,
        ));
    }
    Ok(target)
}

pub fn ensure_shippable(current: BatchStatus) -> Result<(), IllegalTransition> {
    if current == BatchStatus::Ready {
        Ok(())
    } else {
        Err(IllegalTransition::new(ENTITY, "ship", current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchStatus::*;

    #[test]
    fn free_movement_between_working_statuses() {
        assert_eq!(plan_update(InProduction, Ready), Ok(Ready));
        assert_eq!(plan_update(Ready, QualityCheck), Ok(QualityCheck));
        assert_eq!(plan_update(QualityCheck, Rejected), Ok(Rejected));
    }

    #[test]
    fn shipped_only_through_delivery() {
        assert!(plan_update(Ready, Shipped).is_err());
        assert!(ensure_shippable(Ready).is_ok());
        assert!(ensure_shippable(QualityCheck).is_err());
    }

    #[test]
    fn final_statuses_are_frozen() {
        assert!(plan_update(Shipped, Ready).is_err());
        assert!(plan_update(Rejected, InProduction).is_err());
    }
}
