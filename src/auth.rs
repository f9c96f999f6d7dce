//! Authenticated principal extraction.
//!
//! Authentication itself is an external collaborator: a reverse proxy (or
//! the upstream user service) verifies credentials and forwards the stable
//! principal identifier in the `x-user-id` header. This module only lifts
//! that identifier into a typed extractor; the core never reads identity
//! from ambient state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::LibraryError;

/// Header carrying the authenticated principal's identifier.
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// The authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

impl Principal {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = LibraryError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(LibraryError::Unauthorized)?;

        Ok(Principal(id.to_string()))
    }
}
