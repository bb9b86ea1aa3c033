use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::success_response;
use crate::{
    auth::{authorize, Action, Actor, Resource},
    errors::ServiceError,
    services::issues::IssueUpdate,
    AppState,
};

pub fn issues_router() -> Router<AppState> {
    Router::new().route("/:id", get(get_issue).put(update_issue_status))
}

#[utoipa::path(
    get,
    path = "/api/v1/production/orders/{id}/issues",
    params(("id" = Uuid, Path, description = "Production order id")),
    responses(
        (status = 200, description = "Issues of the order, newest first", body = [crate::entities::production_issue::Model]),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "issues"
)]
pub async fn list_order_issues(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let issues = state.services.issues.list_for_order(id).await?;
    Ok(success_response(issues))
}

#[utoipa::path(
    get,
    path = "/api/v1/production/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Issue", body = crate::entities::production_issue::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "issues"
)]
pub async fn get_issue(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::View, Resource::Any)?;
    let issue = state.services.issues.get(id).await?;
    Ok(success_response(issue))
}

#[utoipa::path(
    put,
    path = "/api/v1/production/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue id")),
    request_body = IssueUpdate,
    responses(
        (status = 200, description = "Issue updated", body = crate::entities::production_issue::Model),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "issues"
)]
pub async fn update_issue_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, Action::UpdateIssue, Resource::Any)?;
    let issue = state
        .services
        .issues
        .update_status(id, payload, actor.user_id)
        .await?;
    Ok(success_response(issue))
}
