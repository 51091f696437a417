//! Token endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::handlers::{self, TokenResponse};
use crate::AppState;

/// Create token routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/token", post(issue_token))
}

/// POST /auth/token - sign the posted claims. Needs no credentials; see
/// [`handlers::issue_token`].
async fn issue_token(
    State(state): State<AppState>,
    body: std::result::Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(claims) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    handlers::issue_token(&state, claims).map(Json)
}
