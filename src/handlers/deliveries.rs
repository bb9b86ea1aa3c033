use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{success_response, PaginatedResponse};
use crate::{
    auth::{authorize, Action, Actor, Resource},
    errors::ServiceError,
    services::deliveries::{DeliveryFilter, ReceiveDelivery, RejectDelivery},
    AppState,
};

/// Create the warehouse deliveries router
pub fn deliveries_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries))
        .route("/statistics", get(get_statistics))
        .route("/:id", get(get_delivery))
        .route("/:id/ship", post(ship_delivery))
        .route("/:id/receive", post(receive_delivery))
        .route("/:id/reject", post(reject_delivery))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/deliveries",
    params(DeliveryFilter),
    responses(
        (status = 200, description = "Page of deliveries, soonest expected first"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<DeliveryFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let page = filter.page.unwrap_or(1);
    let per_page = state.config.page_size(filter.per_page);
    let deliveries = state
        .services
        .deliveries
        .list(filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::from(deliveries)))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/deliveries/statistics",
    responses(
        (status = 200, description = "Warehouse counters", body = crate::services::deliveries::DeliveryStatistics)
    ),
    tag = "deliveries"
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let stats = state.services.deliveries.statistics().await?;
    Ok(success_response(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/warehouse/deliveries/{id}",
    params(("id" = Uuid, Path, description = "Delivery id")),
    responses(
        (status = 200, description = "Delivery", body = crate::entities::warehouse_delivery::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let delivery = state.services.deliveries.get(id).await?;
    Ok(success_response(delivery))
}

/// Dispatch a pending delivery
#[utoipa::path(
    post,
    path = "/api/v1/warehouse/deliveries/{id}/ship",
    params(("id" = Uuid, Path, description = "Delivery id")),
    responses(
        (status = 200, description = "Delivery in transit", body = crate::entities::warehouse_delivery::Model),
        (status = 409, description = "Delivery is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn ship_delivery(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ShipDelivery, Resource::Any)?;
    let delivery = state.services.deliveries.ship(id, actor.user_id).await?;
    Ok(success_response(delivery))
}

/// Confirm receipt at the warehouse
#[utoipa::path(
    post,
    path = "/api/v1/warehouse/deliveries/{id}/receive",
    params(("id" = Uuid, Path, description = "Delivery id")),
    request_body = ReceiveDelivery,
    responses(
        (status = 200, description = "Delivery received", body = crate::entities::warehouse_delivery::Model),
        (status = 409, description = "Delivery is not in transit", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn receive_delivery(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveDelivery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ReceiveDelivery, Resource::Any)?;
    let delivery = state
        .services
        .deliveries
        .receive(id, payload, actor.user_id)
        .await?;
    Ok(success_response(delivery))
}

#[utoipa::path(
    post,
    path = "/api/v1/warehouse/deliveries/{id}/reject",
    params(("id" = Uuid, Path, description = "Delivery id")),
    request_body = RejectDelivery,
    responses(
        (status = 200, description = "Delivery rejected", body = crate::entities::warehouse_delivery::Model),
        (status = 409, description = "Delivery already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn reject_delivery(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectDelivery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::RejectDelivery, Resource::Any)?;
    let delivery = state
        .services
        .deliveries
        .reject(id, payload, actor.user_id)
        .await?;
    Ok(success_response(delivery))
}
