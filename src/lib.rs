//! Window production backend
//!
//! Production order lifecycle for a window manufacturer: material stock
//! ledger, production orders, batches, issues and warehouse deliveries.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/production/orders",
            handlers::production_orders::production_orders_router(),
        )
        .nest("/production/batches", handlers::batches::batches_router())
        .nest("/production/issues", handlers::issues::issues_router())
        .nest(
            "/warehouse/deliveries",
            handlers::deliveries::deliveries_router(),
        )
        .nest("/materials", handlers::materials::materials_router())
}

/// Full application router: API, health and the OpenAPI document.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, db) = match db::check_connection(&state.db).await {
        Ok(()) => (axum::http::StatusCode::OK, "up"),
        Err(_) => (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down"),
    };
    (
        status,
        Json(json!({
            "status": if status.is_success() { "ok" } else { "degraded" },
            "database": db,
            "timestamp": state.services.clock.now().to_rfc3339(),
        })),
    )
}
