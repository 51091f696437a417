//! The record set for one resource.

use crate::{query::QueryBuilder, Principal, Record, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A collection of records.
///
/// Records are kept in insertion order, with an id index alongside for direct
/// lookups. The counter holds the last id handed out; ids are never reused.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
    counter: RecordId,
    key_field: Option<String>,
}

/// Serialized form of a collection inside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionState {
    /// Last id handed out
    pub counter: RecordId,
    /// Records in insertion order
    pub records: Vec<Record>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection that mirrors ids into `key_field`.
    ///
    /// Used when a model's auto-increment field is not called `id`.
    pub fn with_key_field(key_field: Option<String>) -> Self {
        Self {
            key_field: key_field.filter(|k| k != "id"),
            ..Self::default()
        }
    }

    /// Rebuild a collection from its persisted state.
    ///
    /// Fails on duplicate ids or a counter behind the largest id.
    pub fn from_state(state: CollectionState, key_field: Option<String>) -> Result<Self, String> {
        let mut collection = Self::with_key_field(key_field);
        collection.counter = state.counter;

        for record in state.records {
            if record.id > state.counter {
                return Err(format!(
                    "record id {} is beyond counter {}",
                    record.id, state.counter
                ));
            }
            if collection.index.contains_key(&record.id) {
                return Err(format!("duplicate record id {}", record.id));
            }
            collection.index.insert(record.id, collection.records.len());
            collection.records.push(record);
        }

        Ok(collection)
    }

    /// Export the persisted state.
    pub fn to_state(&self) -> CollectionState {
        CollectionState {
            counter: self.counter,
            records: self.records.clone(),
        }
    }

    /// Last id handed out (0 when none).
    pub fn counter(&self) -> RecordId {
        self.counter
    }

    /// Get a record by ID.
    pub fn find_by_id(&self, id: RecordId) -> Option<&Record> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    /// Check if a record exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    /// Start a query over this collection.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// All records in insertion order.
    pub fn find(&self) -> Vec<&Record> {
        self.records.iter().collect()
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Insert a record, assigning the next id.
    pub fn insert(
        &mut self,
        mut fields: Map<String, Value>,
        created_by: Option<Principal>,
        timestamp: Timestamp,
    ) -> Record {
        self.counter += 1;
        let id = self.counter;

        if let Some(key) = &self.key_field {
            fields.insert(key.clone(), Value::from(id));
        }

        let record = Record::new(id, fields, created_by, timestamp);
        self.index.insert(id, self.records.len());
        self.records.push(record.clone());
        record
    }

    /// Merge fields into an existing record.
    pub fn update_by_id(
        &mut self,
        id: RecordId,
        mut patch: Map<String, Value>,
        timestamp: Timestamp,
    ) -> Option<Record> {
        let pos = *self.index.get(&id)?;

        if let Some(key) = &self.key_field {
            patch.remove(key);
        }

        let record = &mut self.records[pos];
        record.merge(patch, timestamp);
        Some(record.clone())
    }

    /// Remove a record. Returns whether one was removed.
    pub fn delete_by_id(&mut self, id: RecordId) -> bool {
        let Some(pos) = self.index.remove(&id) else {
            return false;
        };

        self.records.remove(pos);
        for record in &self.records[pos..] {
            if let Some(slot) = self.index.get_mut(&record.id) {
                *slot -= 1;
            }
        }
        true
    }

    /// Count of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if collection has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Owner of a record, if the record exists and has one.
    pub fn owner_of(&self, id: RecordId) -> Option<&Principal> {
        self.find_by_id(id).and_then(|r| r.created_by.as_ref())
    }
}
