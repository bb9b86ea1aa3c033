use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Window Production API",
        version = "0.1.0",
        description = r#"
# Window Production API

Production order lifecycle for a window manufacturer: material stock,
production orders, batches, issues and warehouse deliveries.

## Authentication

Authentication happens at the gateway. Every request carries the caller in
the `X-User-Id` and `X-User-Role` headers (`admin`, `production` or
`warehouse`).

## Errors

Failures share one body:

```json
{
  "error": "Conflict",
  "message": "Illegal transition: cannot start production order in status completed",
  "timestamp": "2026-03-02T10:30:00Z"
}
```
"#
    ),
    paths(
        handlers::production_orders::list_orders,
        handlers::production_orders::create_order,
        handlers::production_orders::get_statistics,
        handlers::production_orders::get_order,
        handlers::production_orders::update_order,
        handlers::production_orders::delete_order,
        handlers::production_orders::confirm_order,
        handlers::production_orders::start_production,
        handlers::production_orders::report_delay,
        handlers::production_orders::update_progress,
        handlers::production_orders::report_issue,
        handlers::production_orders::hold_order,
        handlers::production_orders::resume_order,
        handlers::production_orders::cancel_order,
        handlers::production_orders::get_timeline,
        handlers::production_orders::list_order_materials,
        handlers::production_orders::record_material_usage,
        handlers::batches::list_order_batches,
        handlers::batches::create_batch,
        handlers::batches::ship_to_warehouse,
        handlers::batches::get_batch,
        handlers::batches::update_batch_status,
        handlers::issues::list_order_issues,
        handlers::issues::get_issue,
        handlers::issues::update_issue_status,
        handlers::deliveries::list_deliveries,
        handlers::deliveries::get_statistics,
        handlers::deliveries::get_delivery,
        handlers::deliveries::ship_delivery,
        handlers::deliveries::receive_delivery,
        handlers::deliveries::reject_delivery,
        handlers::materials::list_materials,
        handlers::materials::create_material,
        handlers::materials::list_low_stock,
        handlers::materials::get_material,
        handlers::materials::deactivate_material,
        handlers::materials::list_movements,
        handlers::materials::credit_stock,
        handlers::materials::debit_stock,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::common::PaginationMeta,
    )),
    tags(
        (name = "production-orders", description = "Production order lifecycle"),
        (name = "batches", description = "Production batches and warehouse hand-off"),
        (name = "issues", description = "Production issues"),
        (name = "deliveries", description = "Warehouse deliveries"),
        (name = "materials", description = "Material stock ledger")
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
