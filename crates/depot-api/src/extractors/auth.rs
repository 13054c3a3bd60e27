//! `AuthUser` extractor — reads the identity header injected by the
//! upstream authentication gateway.
//!
//! Authentication itself is an external collaborator; its narrow contract
//! is a trusted `X-User-Id` header on every request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use depot_core::error::AppError;
use depot_service::context::RequestContext;

/// Extracted caller context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing X-User-Id header"))?
            .parse::<Uuid>()
            .map_err(|_| AppError::unauthorized("Invalid X-User-Id header"))?;

        Ok(AuthUser(RequestContext::new(user_id)))
    }
}
