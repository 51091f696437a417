//! HTTP route definitions.

mod auth;
mod health;
mod resources;

use crate::AppState;
use axum::Router;

/// Create all application routes. Resource and token routes live under
/// `prefix` (already normalized, possibly empty).
pub fn create_routes(prefix: &str) -> Router<AppState> {
    let api = Router::new()
        .merge(auth::routes())
        .merge(resources::routes());

    let router = Router::new().merge(health::routes());
    if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    }
}
