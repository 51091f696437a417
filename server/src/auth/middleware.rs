//! Authentication extractor.
//!
//! With auth enabled every request must carry `Authorization: Bearer <token>`
//! signed by the configured secret. With auth disabled requests pass through
//! anonymously.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use mockbase_engine::Principal;

use super::{AuthError, Claims};
use crate::error::AppError;
use crate::AppState;

/// Caller identity extracted from the request.
#[derive(Debug, Clone, Default)]
pub struct AuthUser {
    /// Verified claims; `None` when auth is disabled
    pub claims: Option<Claims>,
}

impl AuthUser {
    /// Principal used for `createdBy` and ownership checks.
    pub fn principal(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }

    pub fn into_principal(self) -> Option<Principal> {
        self.claims.map(|c| c.sub)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(guard) = state.guard.as_deref() else {
            return Ok(AuthUser::default());
        };

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        let claims = guard.verify(token)?;
        Ok(AuthUser {
            claims: Some(claims),
        })
    }
}
