use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::IllegalTransition;

const ENTITY: &str = "warehouse delivery";

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
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected)
    }
}

pub fn plan_ship(current: DeliveryStatus) -> Result<DeliveryStatus, IllegalTransition> {
    match current {
        DeliveryStatus::Pending => Ok(DeliveryStatus::InTransit),
        other => Err(IllegalTransition::new(ENTITY, "ship", other)),
    }
}

pub fn plan_receive(current: DeliveryStatus) -> Result<DeliveryStatus, IllegalTransition> {
    match current {
        DeliveryStatus::InTransit => Ok(DeliveryStatus::Delivered),
        other => Err(IllegalTransition::new(ENTITY, "receive", other)),
    }
}

pub fn plan_reject(current: DeliveryStatus) -> Result<DeliveryStatus, IllegalTransition> {
    if current.is_terminal() {
        Err(IllegalTransition::new(ENTITY, "reject", current))
    } else {
        Ok(DeliveryStatus::Rejected)
    }
}
