use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::{authorize, Action, Actor, Resource},
    errors::ServiceError,
    services::batches::{BatchUpdate, NewBatch, ShipToWarehouse},
    AppState,
};

/// Batch routes outside an order. Order-scoped batch routes live on the
/// production orders router.
pub fn batches_router() -> Router<AppState> {
    Router::new().route("/:id", get(get_batch).put(update_batch_status))
}

#[utoipa::path(
    get,
    path = "/api/v1/production/orders/{id}/batches",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Batches of the order", body = [crate::entities::production_batch::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn list_order_batches(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let batches = state.services.batches.list_for_order(id).await?;
    Ok(success_response(batches))
}

/// Open a batch for an order in production
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/batches",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = NewBatch,
    responses(
        (status = 201, description = "Batch created", body = crate::entities::production_batch::Model),
        (status = 400, description = "Quantity exceeds what is left to batch", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order does not accept batches", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewBatch>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::CreateBatch, Resource::Any)?;
    let batch = state
        .services
        .batches
        .create_batch(id, payload, actor.user_id)
        .await?;
    Ok(created_response(batch))
}

/// Ship a ready batch to the warehouse
#[utoipa::path(
    post,
    path = "/api/v1/production/orders/{id}/ship",
    params(("id" = Uuid, Path, description = "Production order id")),
    request_body = ShipToWarehouse,
    responses(
        (status = 201, description = "Delivery created", body = crate::services::batches::Shipment),
        (status = 404, description = "Batch not found on this order", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch or order cannot ship", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn ship_to_warehouse(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipToWarehouse>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ShipToWarehouse, Resource::Any)?;
    let shipment = state
        .services
        .batches
        .ship_to_warehouse(id, payload, actor.user_id)
        .await?;
    Ok(created_response(shipment))
}

#[utoipa::path(
    get,
    path = "/api/v1/production/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch", body = crate::entities::production_batch::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let batch = state.services.batches.get(id).await?;
    Ok(success_response(batch))
}

/// Move a batch between working statuses or reject it
#[utoipa::path(
    put,
    path = "/api/v1/production/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = BatchUpdate,
    responses(
        (status = 200, description = "Batch updated", body = crate::entities::production_batch::Model),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn update_batch_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<BatchUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::UpdateBatch, Resource::Any)?;
    let batch = state.services.batches.update_status(id, payload).await?;
    Ok(success_response(batch))
}
