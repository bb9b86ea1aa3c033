/*!
 * # Authorization Boundary
 *
 * Authentication happens upstream: the gateway asserts who is calling via
 * the `X-User-Id` and `X-User-Role` headers. This module turns those headers
 * into an [`Actor`] and answers whether that actor may perform an action.
 */

pub mod permissions;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub use permissions::{authorize, can_perform, Action, Resource};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Closed set of staff roles.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Production,
    Warehouse,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing X-User-Id header".to_string()))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| ServiceError::Unauthorized("X-User-Id is not a valid id".to_string()))?;

        let role = header(USER_ROLE_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing X-User-Role header".to_string()))?;
        let role = Role::from_str(role)
            .map_err(|_| ServiceError::Unauthorized(format!("unknown role {}", role)))?;

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<Actor, ServiceError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_actor_from_gateway_headers() {
        let id = Uuid::new_v4();
        let actor = extract(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_ROLE_HEADER, "Warehouse"),
        ])
        .await
        .unwrap();
        assert_eq!(actor, Actor::new(id, Role::Warehouse));
    }

    #[tokio::test]
    async fn missing_or_unknown_identity_is_unauthorized() {
        let missing = extract(&[(USER_ROLE_HEADER, "admin")]).await;
        assert!(matches!(missing, Err(ServiceError::Unauthorized(_))));

        let id = Uuid::new_v4().to_string();
        let unknown = extract(&[(USER_ID_HEADER, &id), (USER_ROLE_HEADER, "customer")]).await;
        assert!(matches!(unknown, Err(ServiceError::Unauthorized(_))));

        let garbled = extract(&[(USER_ID_HEADER, "42"), (USER_ROLE_HEADER, "admin")]).await;
        assert!(matches!(garbled, Err(ServiceError::Unauthorized(_))));
    }
}
