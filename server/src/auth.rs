//! Actor descriptor handed over by the upstream authentication layer.
//!
//! Credentials are verified before requests reach this service; the gateway
//! forwards the result as `x-actor-id` and `x-actor-role` headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::{Actor, Role};
use crate::utils::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::AuthError(format!("Missing {name} header")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = Uuid::parse_str(header(parts, ACTOR_ID_HEADER)?)
            .map_err(|_| AppError::AuthError("Invalid actor id".to_string()))?;
        let role: Role = header(parts, ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(|_| AppError::AuthError("Invalid actor role".to_string()))?;

        Ok(Actor::new(id, role))
    }
}
