//! Token issue handler.

use crate::error::{AppError, Result};
use crate::AppState;
use serde::Serialize;
use serde_json::{Map, Value};

/// Response for a token request.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Sign the posted claims. Only available when auth is enabled.
///
/// The endpoint is open: any caller gets a token for whatever `sub` it
/// posts, so ownership checks only separate cooperating clients. It is a
/// mock login, not access control.
pub fn issue_token(state: &AppState, claims: Map<String, Value>) -> Result<TokenResponse> {
    let guard = state
        .guard
        .as_deref()
        .ok_or_else(|| AppError::NotFound("authentication is disabled".to_string()))?;

    let now_secs = super::now_millis() / 1000;
    let token = guard.generate_token(claims, now_secs)?;

    tracing::debug!("token issued");
    Ok(TokenResponse {
        token,
        expires_in: guard.ttl_secs(),
    })
}
