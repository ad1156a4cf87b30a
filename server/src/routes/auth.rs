//! Caller identity for HTTP routes.
//!
//! Authentication is external: an upstream gateway establishes the user and
//! forwards the id in the `x-user-id` header. Handlers take a `Caller` and
//! leave every permission decision to the services.

use axum::http::StatusCode;
use axum::http::request::Parts;
use uuid::Uuid;
use wire::UserId;

use crate::routes::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S> axum::extract::FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Err(unauthenticated("missing x-user-id header"));
        };
        let user_id = raw
            .to_str()
            .map_err(|_| unauthenticated("x-user-id is not valid text"))?
            .trim()
            .parse::<Uuid>()
            .map_err(|_| unauthenticated("x-user-id is not a uuid"))?;
        Ok(Self(user_id))
    }
}

fn unauthenticated(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "E_UNAUTHENTICATED", message)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
