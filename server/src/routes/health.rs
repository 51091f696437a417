//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service description served at `/`.
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub resources: Vec<String>,
    pub auth: bool,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Root handler.
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let store = state.store.read().await;
    Json(RootResponse {
        name: "Mockbase Server".to_string(),
        resources: store.schema().resource_names().map(String::from).collect(),
        auth: state.auth_enabled(),
    })
}
