//! Mockbase Server - REST mock backend over the mockbase engine.
//!
//! Serves CRUD routes for every declared model, persists each change to a
//! JSON snapshot, and optionally guards routes with signed bearer tokens.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod models;
pub mod response;
mod routes;

use crate::auth::AuthGuard;
use crate::config::Config;
use crate::hooks::{RequestHook, RequestLog};
use axum::Router;
use mockbase_engine::Store;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::now_millis;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub config: Arc<Config>,
    pub guard: Option<Arc<AuthGuard>>,
    pub hooks: Arc<Vec<Arc<dyn RequestHook>>>,
}

impl AppState {
    /// State with the default [`RequestLog`] hook registered.
    pub fn new(store: Store, config: Config) -> Self {
        let guard = config
            .auth_secret
            .as_deref()
            .map(|secret| Arc::new(AuthGuard::new(secret, config.token_ttl_secs)));

        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
            guard,
            hooks: Arc::new(vec![Arc::new(RequestLog) as Arc<dyn RequestHook>]),
        }
    }

    /// Register another hook; it runs after those already registered.
    pub fn with_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        let mut hooks = self.hooks.as_ref().clone();
        hooks.push(Arc::new(hook));
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn auth_enabled(&self) -> bool {
        self.guard.is_some()
    }
}

/// Build the router with hooks, tracing and CORS applied.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes(&state.config.api_prefix))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    hooks::run_hooks,
                )),
        )
        .with_state(state)
}
