//! REST routes for declared resources.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mockbase_engine::Record;
use serde_json::Value;
use std::collections::HashMap;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{self, parse_id};
use crate::response::{DataResponse, ListResponse};
use crate::AppState;

type JsonBody = std::result::Result<Json<Value>, JsonRejection>;

/// Create resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{resource}", get(list).post(create))
        .route(
            "/{resource}/{id}",
            get(show).put(update).patch(update).delete(remove),
        )
}

fn body(body: JsonBody) -> Result<Value> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// GET /{resource}
async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ListResponse<Record>>> {
    handlers::list_records(&state, &resource, query)
        .await
        .map(Json)
}

/// GET /{resource}/{id}
async fn show(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<DataResponse<Record>>> {
    let id = parse_id(&id)?;
    handlers::get_record(&state, &resource, id).await.map(Json)
}

/// POST /{resource}
async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(resource): Path<String>,
    payload: JsonBody,
) -> Result<(StatusCode, Json<DataResponse<Record>>)> {
    let payload = body(payload)?;
    let created = handlers::create_record(&state, user, &resource, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT|PATCH /{resource}/{id}
async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((resource, id)): Path<(String, String)>,
    payload: JsonBody,
) -> Result<Json<DataResponse<Record>>> {
    let id = parse_id(&id)?;
    let payload = body(payload)?;
    handlers::update_record(&state, user, &resource, id, payload)
        .await
        .map(Json)
}

/// DELETE /{resource}/{id}
async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    handlers::delete_record(&state, user, &resource, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
