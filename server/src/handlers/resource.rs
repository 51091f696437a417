//! CRUD handlers for declared resources.
//!
//! Every mutation takes the store's write lock once and holds it through
//! validation, the ownership check, the change and the snapshot write.

use super::{now_millis, ListParams};
use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::response::{DataResponse, ListResponse};
use crate::AppState;
use mockbase_engine::{ensure_can_modify, Error, Mode, Record, RecordId, Store};
use serde_json::Value;
use std::collections::HashMap;

/// Parse the `{id}` path segment.
pub fn parse_id(raw: &str) -> Result<RecordId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid record id '{raw}'")))
}

/// One filtered, sorted page of a resource.
pub async fn list_records(
    state: &AppState,
    resource: &str,
    query: HashMap<String, String>,
) -> Result<ListResponse<Record>> {
    let store = state.store.read().await;
    let model = store
        .schema()
        .model(resource)
        .ok_or_else(|| Error::UnknownResource(resource.to_string()))?;
    let params = ListParams::from_query(model, query)?;

    let mut builder = collection(&store, resource)?.query();
    for filter in params.filters {
        builder = builder.with_filter(filter);
    }
    if let Some((field, direction)) = params.sort {
        builder = builder.sort_by(field, direction);
    }

    Ok(builder.paginate(params.page).map(Record::clone).into())
}

/// Fetch one record.
pub async fn get_record(
    state: &AppState,
    resource: &str,
    id: RecordId,
) -> Result<DataResponse<Record>> {
    let store = state.store.read().await;
    let record = collection(&store, resource)?
        .find_by_id(id)
        .cloned()
        .ok_or_else(|| not_found(resource, id))?;
    Ok(DataResponse::new(record))
}

/// Validate and insert a record owned by the caller.
pub async fn create_record(
    state: &AppState,
    user: AuthUser,
    resource: &str,
    body: Value,
) -> Result<DataResponse<Record>> {
    let mut store = state.store.write().await;
    let fields = store.validator().validate(resource, &body, Mode::Insert)?;

    let record = writer(&mut store, resource)?.insert(fields, user.into_principal(), now_millis())?;

    tracing::debug!(resource, id = record.id, "record created");
    Ok(DataResponse::new(record))
}

/// Validate a partial body and merge it into an existing record.
pub async fn update_record(
    state: &AppState,
    user: AuthUser,
    resource: &str,
    id: RecordId,
    body: Value,
) -> Result<DataResponse<Record>> {
    let mut store = state.store.write().await;
    let patch = store.validator().validate(resource, &body, Mode::Update)?;

    let mut records = writer(&mut store, resource)?;
    let existing = records.find_by_id(id).ok_or_else(|| not_found(resource, id))?;
    ensure_can_modify(state.auth_enabled(), user.principal(), resource, existing)?;

    let record = records.update_by_id(id, patch, now_millis())?;

    tracing::debug!(resource, id, "record updated");
    Ok(DataResponse::new(record))
}

/// Remove a record.
pub async fn delete_record(
    state: &AppState,
    user: AuthUser,
    resource: &str,
    id: RecordId,
) -> Result<()> {
    let mut store = state.store.write().await;

    let mut records = writer(&mut store, resource)?;
    let existing = records.find_by_id(id).ok_or_else(|| not_found(resource, id))?;
    ensure_can_modify(state.auth_enabled(), user.principal(), resource, existing)?;

    records.delete_by_id(id)?;

    tracing::debug!(resource, id, "record deleted");
    Ok(())
}

fn collection<'a>(store: &'a Store, resource: &str) -> Result<&'a mockbase_engine::Collection> {
    store
        .collection(resource)
        .ok_or_else(|| Error::UnknownResource(resource.to_string()).into())
}

fn writer<'a>(
    store: &'a mut Store,
    resource: &str,
) -> Result<mockbase_engine::CollectionWriter<'a>> {
    store
        .collection_mut(resource)
        .ok_or_else(|| Error::UnknownResource(resource.to_string()).into())
}

fn not_found(resource: &str, id: RecordId) -> AppError {
    Error::RecordNotFound {
        resource: resource.to_string(),
        id,
    }
    .into()
}
