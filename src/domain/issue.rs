use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::IllegalTransition;

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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueType {
    #[sea_orm(string_value = "material_shortage")]
    MaterialShortage,
    #[sea_orm(string_value = "equipment_failure")]
    EquipmentFailure,
    #[sea_orm(string_value = "quality_issue")]
    QualityIssue,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
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
pub enum IssueSeverity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

/// Expected effect of an issue on the schedule.
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
pub enum IssueImpact {
    #[sea_orm(string_value = "no_delay")]
    NoDelay,
    #[sea_orm(string_value = "minor_delay")]
    MinorDelay,
    #[sea_orm(string_value = "major_delay")]
    MajorDelay,
    #[sea_orm(string_value = "blocking")]
    Blocking,
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
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "escalated")]
    Escalated,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl IssueStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        use IssueStatus::*;
        match self {
            Open => matches!(next, InProgress | Escalated | Resolved | Cancelled),
            InProgress => matches!(next, Escalated | Resolved | Cancelled),
            Escalated => matches!(next, InProgress | Resolved | Cancelled),
            Resolved | Cancelled => false,
        }
    }
}

pub fn plan_issue_update(
    current: IssueStatus,
    target: IssueStatus,
) -> Result<IssueStatus, IllegalTransition> {
    if current.can_transition_to(target) {
        Ok(target)
    } else {
        Err(IllegalTransition::new(
            "issue",
            format!("move to {}", target),
            current,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IssueStatus::*;

    #[test]
    fn closed_issues_stay_closed() {
        assert!(plan_issue_update(Resolved, InProgress).is_err());
        assert!(plan_issue_update(Cancelled, Open).is_err());
        assert!(plan_issue_update(Open, Open).is_err());
    }

    #[test]
    fn escalation_can_return_to_work() {
        assert_eq!(plan_issue_update(Open, Escalated), Ok(Escalated));
        assert_eq!(plan_issue_update(Escalated, InProgress), Ok(InProgress));
        assert_eq!(plan_issue_update(InProgress, Resolved), Ok(Resolved));
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(IssueSeverity::Critical > IssueSeverity::High);
        assert!(IssueSeverity::Low < IssueSeverity::Medium);
    }
}
