/*!
 * # Permissions
 *
 * Which role may do what. Services never see role literals; handlers call
 * [`authorize`] before invoking them.
 */

use uuid::Uuid;

use super::{Actor, Role};
use crate::errors::ServiceError;

/// Something a caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    View,
    CreateOrder,
    ConfirmOrder,
    StartProduction,
    ReportDelay,
    UpdateProgress,
    ReportIssue,
    UpdateIssue,
    CreateBatch,
    UpdateBatch,
    ShipToWarehouse,
    HoldOrder,
    ResumeOrder,
    CancelOrder,
    CancelOrderOverride,
    RecordMaterialUsage,
    UpdateOrder,
    DeleteOrder,
    ShipDelivery,
    ReceiveDelivery,
    RejectDelivery,
    ManageStock,
}

/// The record an action applies to, as far as the policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resource {
    #[default]
    Any,
    ProductionOrder {
        assigned_to: Option<Uuid>,
    },
}

pub fn can_perform(actor: &Actor, action: Action, resource: Resource) -> bool {
    use Action::*;

    match action {
        View => true,
        CreateOrder | ConfirmOrder | StartProduction | ReportDelay | UpdateProgress
        | ReportIssue | UpdateIssue | CreateBatch | UpdateBatch | ShipToWarehouse | HoldOrder
        | ResumeOrder | CancelOrder | RecordMaterialUsage | ShipDelivery => {
            matches!(actor.role, Role::Admin | Role::Production)
        }
        UpdateOrder => match resource {
            _ if actor.is_admin() => true,
            Resource::ProductionOrder {
                assigned_to: Some(assignee),
            } => assignee == actor.user_id,
            _ => false,
        },
        DeleteOrder | CancelOrderOverride => actor.is_admin(),
        ReceiveDelivery | RejectDelivery | ManageStock => {
            matches!(actor.role, Role::Admin | Role::Warehouse)
        }
    }
}

/// [`can_perform`] as a guard.
pub fn authorize(actor: &Actor, action: Action, resource: Resource) -> Result<(), ServiceError> {
    if can_perform(actor, action, resource) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "role {} may not {}",
            actor.role, action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    #[rstest]
    #[case(Role::Admin, Action::StartProduction, true)]
    #[case(Role::Production, Action::StartProduction, true)]
    #[case(Role::Warehouse, Action::StartProduction, false)]
    #[case(Role::Warehouse, Action::ReceiveDelivery, true)]
    #[case(Role::Production, Action::ReceiveDelivery, false)]
    #[case(Role::Production, Action::ShipDelivery, true)]
    #[case(Role::Production, Action::DeleteOrder, false)]
    #[case(Role::Admin, Action::DeleteOrder, true)]
    #[case(Role::Production, Action::CancelOrderOverride, false)]
    #[case(Role::Warehouse, Action::ManageStock, true)]
    #[case(Role::Production, Action::ManageStock, false)]
    #[case(Role::Warehouse, Action::View, true)]
    fn role_matrix(#[case] role: Role, #[case] action: Action, #[case] allowed: bool) {
        assert_eq!(can_perform(&actor(role), action, Resource::Any), allowed);
    }

    #[test]
    fn only_the_assignee_or_an_admin_updates_an_order() {
        let assignee = actor(Role::Production);
        let other = actor(Role::Production);
        let order = Resource::ProductionOrder {
            assigned_to: Some(assignee.user_id),
        };

        assert!(can_perform(&assignee, Action::UpdateOrder, order));
        assert!(!can_perform(&other, Action::UpdateOrder, order));
        assert!(can_perform(&actor(Role::Admin), Action::UpdateOrder, order));
        assert!(!can_perform(
            &assignee,
            Action::UpdateOrder,
            Resource::ProductionOrder { assigned_to: None }
        ));
    }

    #[test]
    fn authorize_reports_forbidden() {
        let err = authorize(&actor(Role::Warehouse), Action::CreateBatch, Resource::Any)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
