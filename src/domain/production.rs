use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::IllegalTransition;

const ENTITY: &str = "production order";

/// Lifecycle status of a production order.
///
/// Main path: pending -> materials_check -> materials_reserved -> in_progress
/// -> quality_check -> completed -> shipped_to_warehouse -> delivered.
/// `on_hold` can be entered from any active status and left back to the
/// status it was entered from. `cancelled` and `delivered` are terminal.
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
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "materials_check")]
    MaterialsCheck,
    #[sea_orm(string_value = "materials_reserved")]
    MaterialsReserved,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "quality_check")]
    QualityCheck,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "shipped_to_warehouse")]
    ShippedToWarehouse,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl<'de> Deserialize<'de> for ProductionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::deserialize_alias(deserializer, Self::resolve_alias, "production status")
    }
}

/// Statuses `update_progress` may target.
pub const PROGRESS_TARGETS: [ProductionStatus; 5] = [
    ProductionStatus::MaterialsCheck,
    ProductionStatus::MaterialsReserved,
    ProductionStatus::InProgress,
    ProductionStatus::QualityCheck,
    ProductionStatus::Completed,
];

/// Statuses a progress update may start from. Pending orders go through
/// `start` and held orders through `resume`.
pub const PROGRESS_SOURCES: [ProductionStatus; 5] = [
    ProductionStatus::MaterialsCheck,
    ProductionStatus::MaterialsReserved,
    ProductionStatus::InProgress,
    ProductionStatus::QualityCheck,
    ProductionStatus::Completed,
];

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::MaterialsCheck => "materials_check",
            Self::MaterialsReserved => "materials_reserved",
            Self::InProgress => "in_progress",
            Self::QualityCheck => "quality_check",
            Self::Completed => "completed",
            Self::ShippedToWarehouse => "shipped_to_warehouse",
            Self::Delivered => "delivered",
            Self::OnHold => "on_hold",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a stored status, accepting the legacy short vocabulary
    /// (`nowe`, `w_trakcie`, `zakonczone`, `anulowane`) for imported rows.
    /// Legacy values are never written back.
    pub fn resolve_alias(value: &str) -> Option<Self> {
        let status = match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "nowe" => Self::Pending,
            "materials_check" => Self::MaterialsCheck,
            "materials_reserved" => Self::MaterialsReserved,
            "in_progress" | "w_trakcie" => Self::InProgress,
            "quality_check" => Self::QualityCheck,
            "completed" | "zakonczone" => Self::Completed,
            "shipped_to_warehouse" => Self::ShippedToWarehouse,
            "delivered" => Self::Delivered,
            "on_hold" => Self::OnHold,
            "cancelled" | "anulowane" => Self::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Active orders are still in the production part of the lifecycle.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            Self::Completed | Self::ShippedToWarehouse | Self::Delivered | Self::Cancelled
        )
    }

    pub fn allowed_transitions(&self) -> &'static [ProductionStatus] {
        use ProductionStatus::*;
        match self {
            Pending => &[MaterialsCheck, MaterialsReserved, InProgress, OnHold, Cancelled],
            MaterialsCheck => &[
                MaterialsReserved,
                InProgress,
                QualityCheck,
                Completed,
                OnHold,
                Cancelled,
            ],
            MaterialsReserved => &[InProgress, QualityCheck, Completed, OnHold, Cancelled],
            InProgress => &[QualityCheck, Completed, OnHold, Cancelled],
            QualityCheck => &[Completed, OnHold, Cancelled],
            Completed => &[ShippedToWarehouse],
            ShippedToWarehouse => &[Delivered],
            OnHold => &[
                Pending,
                MaterialsCheck,
                MaterialsReserved,
                InProgress,
                QualityCheck,
                Cancelled,
            ],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: ProductionStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

/// True when `statuses` starts at pending and every step either repeats the
/// previous status or follows an edge of the state graph.
pub fn is_valid_path(statuses: &[ProductionStatus]) -> bool {
    match statuses.first() {
        None => true,
        Some(ProductionStatus::Pending) => statuses
            .windows(2)
            .all(|pair| pair[0] == pair[1] || pair[0].can_transition_to(pair[1])),
        Some(_) => false,
    }
}

/// `start` is allowed from pending or materials_reserved.
pub fn plan_start(current: ProductionStatus) -> Result<ProductionStatus, IllegalTransition> {
    match current {
        ProductionStatus::Pending | ProductionStatus::MaterialsReserved => {
            Ok(ProductionStatus::InProgress)
        }
        other => Err(IllegalTransition::new(ENTITY, "start", other)),
    }
}

/// Forward-only progress update. Re-applying the current status is a
/// note-only update and is accepted.
pub fn plan_progress(
    current: ProductionStatus,
    target: ProductionStatus,
) -> Result<ProductionStatus, IllegalTransition> {
    let allowed = PROGRESS_SOURCES.contains(&current)
        && PROGRESS_TARGETS.contains(&target)
        && (current == target || current.can_transition_to(target));
    if allowed {
        Ok(target)
    } else {
        Err(IllegalTransition::new(
            ENTITY,
            format!("move to {}", target),
            current,
        ))
    }
}

/// Cancelling is limited to pending orders unless an administrator
/// explicitly overrides, in which case any status with a cancel edge works.
pub fn plan_cancel(
    current: ProductionStatus,
    admin_override: bool,
) -> Result<ProductionStatus, IllegalTransition> {
    let allowed = match current {
        ProductionStatus::Pending => true,
        other => admin_override && other.can_transition_to(ProductionStatus::Cancelled),
    };
    if allowed {
        Ok(ProductionStatus::Cancelled)
    } else {
        Err(IllegalTransition::new(ENTITY, "cancel", current))
    }
}

pub fn plan_hold(current: ProductionStatus) -> Result<ProductionStatus, IllegalTransition> {
    if current.can_transition_to(ProductionStatus::OnHold) {
        Ok(ProductionStatus::OnHold)
    } else {
        Err(IllegalTransition::new(ENTITY, "put on hold", current))
    }
}

/// Leaves `on_hold` for the status the order was held from, or pending when
/// that is unknown.
pub fn plan_resume(
    current: ProductionStatus,
    held_from: Option<ProductionStatus>,
) -> Result<ProductionStatus, IllegalTransition> {
    if current != ProductionStatus::OnHold {
        return Err(IllegalTransition::new(ENTITY, "resume", current));
    }
    let target = held_from.unwrap_or(ProductionStatus::Pending);
    if current.can_transition_to(target) {
        Ok(target)
    } else {
        Err(IllegalTransition::new(
            ENTITY,
            format!("resume into {}", target),
            current,
        ))
    }
}

/// Guard for operations that only make sense while production is ongoing
/// (delay and issue reports).
pub fn ensure_active(current: ProductionStatus, action: &str) -> Result<(), IllegalTransition> {
    if current.is_active() {
        Ok(())
    } else {
        Err(IllegalTransition::new(ENTITY, action, current))
    }
}

pub fn ensure_deletable(current: ProductionStatus) -> Result<(), IllegalTransition> {
    if current == ProductionStatus::Pending {
        Ok(())
    } else {
        Err(IllegalTransition::new(ENTITY, "delete", current))
    }
}

/// Batches may be opened while the order is being produced or checked.
pub fn ensure_accepts_batches(current: ProductionStatus) -> Result<(), IllegalTransition> {
    match current {
        ProductionStatus::InProgress | ProductionStatus::QualityCheck => Ok(()),
        other => Err(IllegalTransition::new(ENTITY, "create a batch for", other)),
    }
}

/// Batches may leave for the warehouse once production is underway.
pub fn ensure_can_ship_batches(current: ProductionStatus) -> Result<(), IllegalTransition> {
    match current {
        ProductionStatus::InProgress
        | ProductionStatus::QualityCheck
        | ProductionStatus::Completed => Ok(()),
        other => Err(IllegalTransition::new(ENTITY, "ship batches of", other)),
    }
}

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
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::deserialize_alias(deserializer, Self::resolve_alias, "priority")
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    /// Scaling applied to the base production time.
    pub fn time_multiplier(&self) -> Decimal {
        match self {
            Self::Urgent => dec!(0.8),
            Self::High => dec!(0.9),
            Self::Normal => dec!(1.0),
            Self::Low => dec!(1.2),
        }
    }

    pub fn resolve_alias(value: &str) -> Option<Self> {
        let priority = match value.trim().to_ascii_lowercase().as_str() {
            "low" | "niska" => Self::Low,
            "normal" | "normalna" => Self::Normal,
            "high" | "wysoka" => Self::High,
            "urgent" | "pilne" => Self::Urgent,
            _ => return None,
        };
        Some(priority)
    }
}

/// Why an order exists.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    #[sea_orm(string_value = "customer_order")]
    CustomerOrder,
    #[sea_orm(string_value = "stock_replenishment")]
    StockReplenishment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sea_orm::Iterable;
    use ProductionStatus::*;

    #[test]
    fn terminal_statuses_have_no_exits() {
        for status in ProductionStatus::iter() {
            if status.is_terminal() {
                assert!(status.allowed_transitions().is_empty(), "{status}");
            }
        }
    }

    #[test]
    fn pending_never_jumps_to_delivered() {
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!is_valid_path(&[Pending, Delivered]));
        assert!(is_valid_path(&[
            Pending,
            InProgress,
            QualityCheck,
            Completed,
            ShippedToWarehouse,
            Delivered
        ]));
    }

    #[test]
    fn paths_must_start_pending() {
        assert!(!is_valid_path(&[InProgress, Completed]));
        assert!(is_valid_path(&[]));
        assert!(is_valid_path(&[Pending, Pending, OnHold, Pending]));
    }

    #[rstest]
    #[case(Pending, true)]
    #[case(MaterialsReserved, true)]
    #[case(MaterialsCheck, false)]
    #[case(InProgress, false)]
    #[case(Completed, false)]
    #[case(Cancelled, false)]
    fn start_only_from_pending_or_reserved(#[case] from: ProductionStatus, #[case] ok: bool) {
        assert_eq!(plan_start(from).is_ok(), ok);
    }

    #[rstest]
    #[case(InProgress, QualityCheck, true)]
    #[case(QualityCheck, Completed, true)]
    #[case(Completed, Completed, true)]
    #[case(QualityCheck, InProgress, false)]
    #[case(Completed, QualityCheck, false)]
    #[case(Pending, Completed, false)]
    #[case(InProgress, ShippedToWarehouse, false)]
    #[case(OnHold, Completed, false)]
    #[case(Pending, InProgress, false)]
    #[case(Pending, MaterialsCheck, false)]
    #[case(OnHold, QualityCheck, false)]
    #[case(MaterialsCheck, InProgress, true)]
    fn progress_is_forward_only(
        #[case] from: ProductionStatus,
        #[case] to: ProductionStatus,
        #[case] ok: bool,
    ) {
        assert_eq!(plan_progress(from, to).is_ok(), ok, "{from} -> {to}");
    }

    #[test]
    fn cancel_requires_override_outside_pending() {
        assert_eq!(plan_cancel(Pending, false), Ok(Cancelled));
        assert!(plan_cancel(InProgress, false).is_err());
        assert_eq!(plan_cancel(InProgress, true), Ok(Cancelled));
        assert!(plan_cancel(Completed, true).is_err());
        assert!(plan_cancel(Cancelled, true).is_err());
    }

    #[test]
    fn hold_and_resume_round_trip() {
        assert_eq!(plan_hold(QualityCheck), Ok(OnHold));
        assert!(plan_hold(OnHold).is_err());
        assert!(plan_hold(Completed).is_err());
        assert_eq!(plan_resume(OnHold, Some(QualityCheck)), Ok(QualityCheck));
        assert_eq!(plan_resume(OnHold, None), Ok(Pending));
        assert!(plan_resume(InProgress, None).is_err());
    }

    #[test]
    fn illegal_transition_message_names_status() {
        let err = plan_start(Completed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot start production order in status completed"
        );
    }

    #[test]
    fn legacy_vocabulary_maps_to_canonical() {
        assert_eq!(ProductionStatus::resolve_alias("nowe"), Some(Pending));
        assert_eq!(ProductionStatus::resolve_alias("w_trakcie"), Some(InProgress));
        assert_eq!(ProductionStatus::resolve_alias("zakonczone"), Some(Completed));
        assert_eq!(ProductionStatus::resolve_alias("anulowane"), Some(Cancelled));
        assert_eq!(ProductionStatus::resolve_alias("in_progress"), Some(InProgress));
        assert_eq!(ProductionStatus::resolve_alias("archived"), None);
        assert_eq!(Priority::resolve_alias("pilne"), Some(Priority::Urgent));
    }

    #[test]
    fn serde_reads_legacy_names_and_writes_canonical_ones() {
        let parsed: ProductionStatus = serde_json::from_str("\"w_trakcie\"").unwrap();
        assert_eq!(parsed, InProgress);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"in_progress\"");

        let parsed: Priority = serde_json::from_str("\"pilne\"").unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"urgent\"");

        let parsed: ProductionStatus = serde_json::from_str("\"quality_check\"").unwrap();
        assert_eq!(parsed, QualityCheck);
    }

    #[test]
    fn unknown_status_is_rejected_by_serde() {
        let parsed: Result<ProductionStatus, _> = serde_json::from_str("\"archived\"");
        assert!(parsed.is_err());
        let parsed: Result<Priority, _> = serde_json::from_str("\"asap\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn display_matches_stored_value() {
        for status in ProductionStatus::iter() {
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
