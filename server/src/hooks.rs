//! Pre/post request hooks.
//!
//! Hooks are registered on [`AppState`] and run by a single middleware around
//! every request: `before` in registration order, `after` in reverse.

use crate::{error::AppError, AppState};
use axum::{
    extract::{Request, State},
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

/// Header carrying the per-request id.
pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// What an `after` hook sees of the request that produced a response.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub started: Instant,
}

/// Code run around every request.
pub trait RequestHook: Send + Sync {
    /// Inspect or rewrite the request. An error short-circuits with that
    /// error's response; handlers and later hooks do not run.
    fn before(&self, _parts: &mut Parts) -> Result<(), AppError> {
        Ok(())
    }

    /// Inspect or rewrite the response.
    fn after(&self, _request: &RequestInfo, _response: &mut Response) {}
}

/// Tags each request with an `x-request-id` and logs its outcome.
#[derive(Debug, Default)]
pub struct RequestLog;

impl RequestHook for RequestLog {
    fn before(&self, parts: &mut Parts) -> Result<(), AppError> {
        if !parts.headers.contains_key(&REQUEST_ID) {
            let id = uuid::Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                parts.headers.insert(REQUEST_ID.clone(), value);
            }
        }
        Ok(())
    }

    fn after(&self, request: &RequestInfo, response: &mut Response) {
        if let Some(id) = request.headers.get(&REQUEST_ID) {
            response.headers_mut().insert(REQUEST_ID.clone(), id.clone());
        }

        tracing::info!(
            method = %request.method,
            path = %request.uri.path(),
            status = response.status().as_u16(),
            latency_ms = request.started.elapsed().as_millis() as u64,
            request_id = request
                .headers
                .get(&REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-"),
            "request finished"
        );
    }
}

/// Middleware running every registered hook.
pub async fn run_hooks(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let (mut parts, body) = request.into_parts();

    let rejection = state
        .hooks
        .iter()
        .find_map(|hook| hook.before(&mut parts).err());

    let info = RequestInfo {
        method: parts.method.clone(),
        uri: parts.uri.clone(),
        headers: parts.headers.clone(),
        started,
    };

    let mut response = match rejection {
        Some(err) => err.into_response(),
        None => next.run(Request::from_parts(parts, body)).await,
    };

    for hook in state.hooks.iter().rev() {
        hook.after(&info, &mut response);
    }
    response
}
