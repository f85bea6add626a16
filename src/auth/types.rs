//! Authenticated identity and its extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use uuid::Uuid;

use super::errors::ApiAuthError;
use crate::token::TokenPayload;

/// The verified subset of a token payload handed to downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    pub username: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl From<&TokenPayload> for AuthenticatedIdentity {
    fn from(payload: &TokenPayload) -> Self {
        Self {
            user_id: payload.id,
            username: payload.sub.clone(),
            display_name: payload.name.clone(),
        }
    }
}

/// Extractor for handlers behind [`super::require_session`].
/// Reads the identity the middleware placed in the request extensions.
pub struct Auth(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(Auth)
            .ok_or_else(ApiAuthError::missing_identity)
    }
}
