//! One constructor per lifecycle notification.

use serde_json::json;

use super::{NotificationIntent, NotificationPriority, NotificationType};
use crate::auth::Role;
use crate::domain::{IssueSeverity, Priority};
use crate::entities::{
    material, production_batch, production_issue, production_order, warehouse_delivery,
};

fn order_link(order: &production_order::Model) -> String {
    format!("/production/orders/{}", order.id)
}

pub fn new_production_order(order: &production_order::Model) -> NotificationIntent {
    let priority = if order.priority == Priority::Urgent {
        NotificationPriority::Critical
    } else {
        NotificationPriority::Normal
    };
    NotificationIntent::for_role(
        Role::Production,
        NotificationType::NewProductionOrder,
        priority,
        "New production order",
        format!(
            "Production order {} for {} window(s) was created.",
            order.order_number, order.quantity
        ),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "order_number": order.order_number,
        "priority": order.priority,
    }))
    .with_link(order_link(order))
}

pub fn order_confirmed(order: &production_order::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionOrderConfirmed,
        NotificationPriority::Normal,
        "Production order confirmed",
        format!("Production order {} was confirmed.", order.order_number),
    )
    .with_data(json!({ "production_order_id": order.id }))
    .with_link(order_link(order))
}

pub fn production_started(order: &production_order::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionStarted,
        NotificationPriority::Normal,
        "Production started",
        format!(
            "Production of order {} started; estimated {} hour(s).",
            order.order_number,
            order.production_time_hours.unwrap_or_default()
        ),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "estimated_completion_at": order.estimated_completion_at,
    }))
    .with_link(order_link(order))
}

pub fn warehouse_delivery_scheduled(order: &production_order::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Warehouse,
        NotificationType::WarehouseDeliveryScheduled,
        NotificationPriority::Normal,
        "Delivery from production scheduled",
        format!(
            "Order {} is expected at the warehouse on {}.",
            order.order_number,
            order
                .estimated_warehouse_delivery_at
                .map(|at| at.date_naive().to_string())
                .unwrap_or_default()
        ),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "estimated_warehouse_delivery_at": order.estimated_warehouse_delivery_at,
    }))
    .with_link("/warehouse")
}

pub fn order_delayed(order: &production_order::Model, reason: &str) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionOrderDelayed,
        NotificationPriority::Critical,
        "Production order delayed",
        format!("Order {} is delayed: {}", order.order_number, reason),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "delay_reason": reason,
        "revised_completion_at": order.revised_completion_at,
    }))
    .with_link(order_link(order))
}

pub fn order_updated(order: &production_order::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionOrderUpdated,
        NotificationPriority::Normal,
        "Production order updated",
        format!("Order {} is now {}.", order.order_number, order.status),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "status": order.status,
    }))
    .with_link(order_link(order))
}

pub fn production_completed(order: &production_order::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Warehouse,
        NotificationType::ProductionCompleted,
        NotificationPriority::High,
        "Production completed",
        format!(
            "Order {} is finished and ready for pickup.",
            order.order_number
        ),
    )
    .with_data(json!({ "production_order_id": order.id }))
    .with_link("/warehouse")
}

pub fn issue_reported(
    order: &production_order::Model,
    issue: &production_issue::Model,
) -> NotificationIntent {
    let priority = match issue.severity {
        IssueSeverity::Low => NotificationPriority::Low,
        IssueSeverity::Medium => NotificationPriority::Normal,
        IssueSeverity::High => NotificationPriority::High,
        IssueSeverity::Critical => NotificationPriority::Critical,
    };
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionIssueReported,
        priority,
        "Production issue reported",
        format!(
            "{} {} issue on order {}: {}",
            issue.severity, issue.issue_type, order.order_number, issue.description
        ),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "issue_id": issue.id,
        "severity": issue.severity,
        "impact": issue.impact,
    }))
    .with_link(order_link(order))
}

pub fn order_on_hold(
    order: &production_order::Model,
    issue: &production_issue::Model,
) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Production,
        NotificationType::ProductionOrderOnHold,
        NotificationPriority::Critical,
        "Critical issue: order on hold",
        format!(
            "Order {} was put on hold: {}",
            order.order_number, issue.description
        ),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "issue_id": issue.id,
    }))
    .with_link(order_link(order))
}

pub fn order_cancelled(order: &production_order::Model, reason: &str) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::ProductionOrderCancelled,
        NotificationPriority::Normal,
        "Production order cancelled",
        format!("Order {} was cancelled: {}", order.order_number, reason),
    )
    .with_data(json!({
        "production_order_id": order.id,
        "reason": reason,
    }))
    .with_link(order_link(order))
}

pub fn delivery_incoming(
    order: &production_order::Model,
    batch: &production_batch::Model,
    delivery: &warehouse_delivery::Model,
) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Warehouse,
        NotificationType::WarehouseDeliveryIncoming,
        NotificationPriority::High,
        "Delivery on its way",
        format!(
            "Batch {} of order {} was shipped as {}.",
            batch.batch_number, order.order_number, delivery.delivery_number
        ),
    )
    .with_data(json!({
        "delivery_id": delivery.id,
        "batch_id": batch.id,
        "production_order_id": order.id,
        "expected_delivery_date": delivery.expected_delivery_date,
    }))
    .with_link("/warehouse")
}

pub fn delivery_received(delivery: &warehouse_delivery::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Production,
        NotificationType::DeliveryReceived,
        NotificationPriority::Normal,
        "Delivery received",
        format!(
            "Delivery {} was received by the warehouse.",
            delivery.delivery_number
        ),
    )
    .with_data(json!({
        "delivery_id": delivery.id,
        "production_order_id": delivery.production_order_id,
    }))
    .with_link(format!("/production/orders/{}", delivery.production_order_id))
}

pub fn delivery_rejected(delivery: &warehouse_delivery::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Production,
        NotificationType::DeliveryRejected,
        NotificationPriority::Critical,
        "Delivery rejected",
        format!(
            "Delivery {} was rejected. Reason: {}",
            delivery.delivery_number,
            delivery.rejection_reason.as_deref().unwrap_or("not given")
        ),
    )
    .with_data(json!({
        "delivery_id": delivery.id,
        "production_order_id": delivery.production_order_id,
    }))
    .with_link(format!("/production/orders/{}", delivery.production_order_id))
}

pub fn low_stock(material: &material::Model) -> NotificationIntent {
    NotificationIntent::for_role(
        Role::Admin,
        NotificationType::LowStock,
        NotificationPriority::High,
        "Low stock",
        format!(
            "Material {} is low: {} {} left (minimum {}).",
            material.name,
            material.current_stock.normalize(),
            material.unit,
            material.min_stock.normalize()
        ),
    )
    .with_data(json!({
        "material_id": material.id,
        "current_stock": material.current_stock,
        "min_stock": material.min_stock,
    }))
    .with_link("/materials")
}
