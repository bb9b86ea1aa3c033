use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, success_response};
use crate::{
    auth::{authorize, Action, Actor, Resource},
    errors::ServiceError,
    services::inventory_ledger::{MaterialFilter, NewMaterial, StockAdjustment},
    AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementQuery {
    /// Most recent movements to return
    pub limit: Option<u64>,
}

/// Create the materials router
pub fn materials_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route("/low-stock", get(list_low_stock))
        .route("/:id", get(get_material).delete(deactivate_material))
        .route("/:id/movements", get(list_movements))
        .route("/:id/credit", post(credit_stock))
        .route("/:id/debit", post(debit_stock))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials",
    params(MaterialFilter),
    responses(
        (status = 200, description = "Materials", body = [crate::entities::material::Model])
    ),
    tag = "materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<MaterialFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let materials = state.services.inventory.list_materials(filter).await?;
    Ok(success_response(materials))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials",
    request_body = NewMaterial,
    responses(
        (status = 201, description = "Material registered", body = crate::entities::material::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewMaterial>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ManageStock, Resource::Any)?;
    let material = state
        .services
        .inventory
        .create_material(payload, actor.user_id)
        .await?;
    Ok(created_response(material))
}

/// Active materials at or below their minimum stock
#[utoipa::path(
    get,
    path = "/api/v1/materials/low-stock",
    responses(
        (status = 200, description = "Low stock materials", body = [crate::entities::material::Model])
    ),
    tag = "materials"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let materials = state.services.inventory.low_stock_materials().await?;
    Ok(success_response(materials))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    params(("id" = Uuid, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material", body = crate::entities::material::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let material = state.services.inventory.get_material(id).await?;
    Ok(success_response(material))
}

/// Soft-delete: the material stays in the ledger but is no longer consumed
#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    params(("id" = Uuid, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material deactivated", body = crate::entities::material::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn deactivate_material(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ManageStock, Resource::Any)?;
    let material = state.services.inventory.deactivate_material(id).await?;
    Ok(success_response(material))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/movements",
    params(("id" = Uuid, Path, description = "Material id"), MovementQuery),
    responses(
        (status = 200, description = "Stock movements, newest first", body = [crate::entities::stock_movement::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<MovementQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let movements = state
        .services
        .inventory
        .list_movements(id, query.limit)
        .await?;
    Ok(success_response(movements))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/credit",
    params(("id" = Uuid, Path, description = "Material id")),
    request_body = StockAdjustment,
    responses(
        (status = 201, description = "Stock credited", body = crate::entities::stock_movement::Model),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn credit_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustment>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ManageStock, Resource::Any)?;
    let movement = state
        .services
        .inventory
        .credit(id, payload, actor.user_id)
        .await?;
    Ok(created_response(movement))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/debit",
    params(("id" = Uuid, Path, description = "Material id")),
    request_body = StockAdjustment,
    responses(
        (status = 201, description = "Stock debited", body = crate::entities::stock_movement::Model),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn debit_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustment>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::ManageStock, Resource::Any)?;
    let movement = state
        .services
        .inventory
        .debit(id, payload, actor.user_id)
        .await?;
    Ok(created_response(movement))
}
