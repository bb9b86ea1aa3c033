use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{
    created_response, no_content_response, order_resource, success_response, PaginatedResponse,
};
use crate::{
    auth::{authorize, can_perform, Action, Actor, Resource},
    errors::ServiceError,
    services::production_orders::{
        ConfirmOrder, NewIssue, NewProductionOrder, OrderUpdate, ProductionOrderFilter,
        RecordMaterialUsage, ReportDelay, UpdateProgress,
    },
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HoldOrderRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResumeOrderRequest {
    pub notes: Option<String>,
}

/// Create the production orders router
pub fn production_orders_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/statistics", get(get_statistics))
        .route(
            "/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/start", post(start_production))
        .route("/:id/delay", post(report_delay))
        .route("/:id/progress", post(update_progress))
        .route(
            "/:id/issues",
            get(super::issues::list_order_issues).post(report_issue),
        )
        .route(
            "/:id/batches",
            get(super::batches::list_order_batches).post(super::batches::create_batch),
        )
        .route("/:id/ship", post(super::batches::ship_to_warehouse))
        .route("/:id/hold", post(hold_order))
        .route("/:id/resume", post(resume_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/timeline", get(get_timeline))
        .route("/:id/materials", get(list_order_materials))
        .route(
            "/:id/materials/:reservation_id/usage",
            post(record_material_usage),
        )
}

/// List production orders
#[utoipa::path(
    get,
    path = "/api/v1/production/orders",
    params(ProductionOrderFilter),
    responses(
        (status = 200, description = "Page of production orders"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<ProductionOrderFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let page = filter.page.unwrap_or(1);
    let per_page = state.config.page_size(filter.per_page);
    let orders = state
        .services
        .production_orders
        .list(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(orders)))
}

/// Create a production order
#[utoipa::path(
    post,
    path = "/api/v1/production/orders",
    request_body = NewProductionOrder,
    responses(
        (status = 201, description = "Production order created", body = crate::entities::production_order::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Window not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient material", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewProductionOrder>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::CreateOrder, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .create(payload, actor.user_id)
        .await?;
    Ok(created_response(order))
}

/// Production dashboard counters
#[utoipa::path(
    get,
    path = "/api/v1/production/orders/statistics",
    responses(
        (status = 200, description = "Production statistics", body = crate::services::production_orders::ProductionStatistics)
    ),
    tag = "production-orders"
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let stats = state.services.production_orders.statistics().await?;
    Ok(success_response(stats))
}

/// Get an order with its items, materials, timeline, batches, issues and deliveries
#[utoipa::path(
    get,
    path = "/api/v1/production/orders/{id}",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Production order details", body = crate::services::production_orders::ProductionOrderDetails),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let details = state.services.production_orders.get_details(id).await?;
    Ok(success_response(details))
}

/// Update descriptive fields of an order
#[utoipa::path(
    put,
    path = "/api/v1/production/orders/{id}",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = OrderUpdate,
    responses(
        (status = 200, description = "Order updated", body = crate::entities::production_order::Model),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is closed or was modified concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    let current = state.services.production_orders.get(id).await?;
    authorize(&actor, Action::UpdateOrder, order_resource(&current))?;
    let order = state
        .services
        .production_orders
        .update(id, payload, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Delete a pending order
#[utoipa::path(
    delete,
    path = "/api/v1/production/orders/{id}",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is no longer pending", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::DeleteOrder, Resource::Any)?;
    state.services.production_orders.delete(id).await?;
    Ok(no_content_response())
}

/// Confirm a pending order
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = ConfirmOrder,
    responses(
        (status = 200, description = "Order confirmed", body = crate::entities::production_order::Model),
        (status = 400, description = "Completion date is not in the future", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not pending or already confirmed", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmOrder>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ConfirmOrder, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .confirm(id, payload, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Start production and consume materials
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/start",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Production started", body = crate::entities::production_order::Model),
        (status = 409, description = "Order cannot be started", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn start_production(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::StartProduction, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .start(id, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Report a production delay
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/delay",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = ReportDelay,
    responses(
        (status = 200, description = "Delay recorded", body = crate::entities::production_order::Model),
        (status = 409, description = "Order is not active", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn report_delay(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportDelay>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ReportDelay, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .report_delay(id, payload, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Move an order forward along the production path
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/progress",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = UpdateProgress,
    responses(
        (status = 200, description = "Progress recorded", body = crate::entities::production_order::Model),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn update_progress(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProgress>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::UpdateProgress, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .update_progress(id, payload, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Report a production issue
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/issues",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = NewIssue,
    responses(
        (status = 201, description = "Issue reported", body = crate::entities::production_issue::Model),
        (status = 409, description = "Order is not active", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewIssue>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ReportIssue, Resource::Any)?;
    let issue = state
        .services
        .production_orders
        .report_issue(id, payload, actor.user_id)
        .await?;
    Ok(created_response(issue))
}

/// Put an order on hold
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/hold",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = HoldOrderRequest,
    responses(
        (status = 200, description = "Order on hold", body = crate::entities::production_order::Model),
        (status = 409, description = "Order cannot be held", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn hold_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<HoldOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::HoldOrder, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .hold(id, payload.reason, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Resume a held order
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/resume",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = ResumeOrderRequest,
    responses(
        (status = 200, description = "Order resumed", body = crate::entities::production_order::Model),
        (status = 409, description = "Order is not on hold", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn resume_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResumeOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ResumeOrder, Resource::Any)?;
    let order = state
        .services
        .production_orders
        .resume(id, payload.notes, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Cancel an order. Administrators may cancel orders past `pending`.
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = crate::entities::production_order::Model),
        (status = 409, description = "Order cannot be cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::CancelOrder, Resource::Any)?;
    let admin_override = can_perform(&actor, Action::CancelOrderOverride, Resource::Any);
    let order = state
        .services
        .production_orders
        .cancel(id, payload.reason, admin_override, actor.user_id)
        .await?;
    Ok(success_response(order))
}

/// Status history of an order, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/production/orders/{id}/timeline",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Timeline entries", body = [crate::entities::production_timeline::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn get_timeline(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let timeline = state.services.production_orders.timeline(id).await?;
    Ok(success_response(timeline))
}

/// Material reservations made when production started
#[utoipa::path(
    get,
    path = "/api/v1/production/orders/{id}/materials",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Material reservations", body = [crate::entities::production_material::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn list_order_materials(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let materials = state.services.production_orders.materials(id).await?;
    Ok(success_response(materials))
}

/// Record usage and returns against a material reservation
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/materials/{reservation_id}/usage",
    params(
        ("id" = Uuid, Path, description = "Production order id"),
        ("reservation_id" = Uuid, Path, description = "Material reservation id")
    ),
    request_body = RecordMaterialUsage,
    responses(
        (status = 200, description = "Usage recorded", body = crate::entities::production_material::Model),
        (status = 400, description = "Invalid quantities", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-orders"
)]
pub async fn record_material_usage(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, reservation_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RecordMaterialUsage>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::RecordMaterialUsage, Resource::Any)?;
    let reservation = state
        .services
        .production_orders
        .record_material_usage(id, reservation_id, payload, actor.user_id)
        .await?;
    Ok(success_response(reservation))
}
