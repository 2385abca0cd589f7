//! Caller identity.
//!
//! Authentication happens upstream: the identity gateway forwards the
//! authenticated user as an `x-user-id` header, and every mutating handler
//! takes an [`Actor`] extracted from it. Roles are resolved by the engine's
//! authorizer, not here.

use axum::{extract::FromRequestParts, http::request::Parts};
use league_engine::tournament::UserId;

use super::errors::ApiError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .map(Actor)
            .ok_or(ApiError::MissingActor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Actor, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_numeric_header_is_accepted() {
        assert_eq!(extract(Some("42")).await.unwrap(), Actor(42));
        assert_eq!(extract(Some(" 7 ")).await.unwrap(), Actor(7));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_rejected() {
        assert!(matches!(extract(None).await, Err(ApiError::MissingActor)));
        assert!(matches!(extract(Some("alice")).await, Err(ApiError::MissingActor)));
    }
}
