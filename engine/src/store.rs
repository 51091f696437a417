//! Store - the owner of every collection.
//!
//! The Store builds one [`Collection`] per model, restores them from the
//! snapshot file on startup, and rewrites that file after every mutation made
//! through a [`CollectionWriter`].

use crate::{
    error::Result,
    snapshot::{SnapshotMetadata, StoreSnapshot},
    validate::{Mode, Validator},
    Collection, Error, Principal, Record, RecordId, ResourceName, Schema, Timestamp,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The main store holding all state.
#[derive(Debug, Clone)]
pub struct Store {
    /// Models served by this store
    schema: Schema,
    /// Collections by resource name
    collections: HashMap<ResourceName, Collection>,
    /// Snapshot file; `None` keeps the store in memory only
    storage_path: Option<PathBuf>,
}

impl Store {
    /// Create an in-memory store with one empty collection per model.
    pub fn new(schema: Schema) -> Self {
        let collections = schema
            .models()
            .map(|model| {
                let key = model.auto_increment_field().map(|f| f.name.clone());
                (model.resource_name.clone(), Collection::with_key_field(key))
            })
            .collect();

        Self {
            schema,
            collections,
            storage_path: None,
        }
    }

    /// Open a file-backed store.
    ///
    /// Restores the snapshot at `path` when one exists. Otherwise the models'
    /// seed records are inserted (stamped with `now`) and written out.
    pub fn open(schema: Schema, path: impl Into<PathBuf>, now: Timestamp) -> Result<Self> {
        let mut store = Self::new(schema);
        let path = path.into();

        match StoreSnapshot::read_from(&path)? {
            Some(snapshot) => store.import_state(snapshot)?,
            None => {
                store.seed(now)?;
            }
        }

        store.storage_path = Some(path);
        store.flush()?;
        Ok(store)
    }

    /// Insert every model's seed records. Returns how many were inserted.
    ///
    /// Seeds are validated like any insert; the first invalid seed aborts.
    pub fn seed(&mut self, now: Timestamp) -> Result<usize> {
        let mut seeded = Vec::new();
        {
            let validator = self.validator();
            for model in self.schema.models() {
                for seed in &model.seed {
                    let fields = validator.validate(
                        &model.resource_name,
                        &Value::Object(seed.clone()),
                        Mode::Insert,
                    )?;
                    seeded.push((model.resource_name.clone(), fields));
                }
            }
        }

        let count = seeded.len();
        for (resource, fields) in seeded {
            if let Some(collection) = self.collections.get_mut(&resource) {
                collection.insert(fields, None, now);
            }
        }
        if count > 0 {
            self.persist()?;
        }
        Ok(count)
    }

    /// Get the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validator bound to this store's schema.
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.schema)
    }

    /// Snapshot file, if the store is file-backed.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Get a collection by resource name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Get a collection for writing. Mutations through the returned handle
    /// are persisted before they return.
    pub fn collection_mut(&mut self, name: &str) -> Option<CollectionWriter<'_>> {
        if !self.collections.contains_key(name) {
            return None;
        }
        Some(CollectionWriter {
            store: self,
            resource: name.to_string(),
        })
    }

    /// Export the current store state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        for (name, collection) in &self.collections {
            snapshot.add_collection(name.clone(), collection.to_state());
        }
        snapshot
    }

    /// Import state from a snapshot.
    ///
    /// This replaces the current state with the snapshot's state. Models the
    /// snapshot does not mention start empty. Nothing changes on error.
    pub fn import_state(&mut self, mut snapshot: StoreSnapshot) -> Result<()> {
        snapshot.validate(&self.schema)?;

        let mut collections = HashMap::with_capacity(self.schema.len());
        for model in self.schema.models() {
            let name = &model.resource_name;
            let state = snapshot
                .collections
                .remove(name)
                .unwrap_or_default();
            let key = model.auto_increment_field().map(|f| f.name.clone());
            let collection = Collection::from_state(state, key)
                .map_err(|e| Error::InvalidSnapshot(format!("{name}: {e}")))?;
            collections.insert(name.clone(), collection);
        }

        self.collections = collections;
        Ok(())
    }

    /// Write the full state to the snapshot file, if there is one.
    pub fn flush(&self) -> Result<()> {
        self.persist()
    }

    /// Tear the store down, flushing state one last time.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    /// Get snapshot metadata without full export.
    pub fn snapshot_metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: crate::snapshot::SNAPSHOT_FORMAT_VERSION,
            collection_count: self.collections.len(),
            record_count: self.collections.values().map(Collection::len).sum(),
        }
    }

    fn persist(&self) -> Result<()> {
        match &self.storage_path {
            Some(path) => self.export_state().write_to(path),
            None => Ok(()),
        }
    }
}

/// Write access to one collection.
///
/// Each mutation changes memory first and then rewrites the snapshot. If the
/// write fails the change stays applied in memory and the error is returned.
#[derive(Debug)]
pub struct CollectionWriter<'a> {
    store: &'a mut Store,
    resource: ResourceName,
}

impl CollectionWriter<'_> {
    /// Resource this writer targets.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Read a record before changing it (ownership checks).
    pub fn find_by_id(&self, id: RecordId) -> Option<&Record> {
        self.store.collection(&self.resource)?.find_by_id(id)
    }

    /// Insert a record and persist.
    pub fn insert(
        &mut self,
        fields: Map<String, Value>,
        created_by: Option<Principal>,
        timestamp: Timestamp,
    ) -> Result<Record> {
        let record = self.target()?.insert(fields, created_by, timestamp);
        self.store.persist()?;
        Ok(record)
    }

    /// Merge fields into a record and persist.
    pub fn update_by_id(
        &mut self,
        id: RecordId,
        patch: Map<String, Value>,
        timestamp: Timestamp,
    ) -> Result<Record> {
        let record = self
            .target()?
            .update_by_id(id, patch, timestamp)
            .ok_or_else(|| Error::RecordNotFound {
                resource: self.resource.clone(),
                id,
            })?;
        self.store.persist()?;
        Ok(record)
    }

    /// Delete a record and persist. Returns whether a record was removed.
    pub fn delete_by_id(&mut self, id: RecordId) -> Result<bool> {
        let removed = self.target()?.delete_by_id(id);
        if removed {
            self.store.persist()?;
        }
        Ok(removed)
    }

    fn target(&mut self) -> Result<&mut Collection> {
        self.store
            .collections
            .get_mut(&self.resource)
            .ok_or_else(|| Error::UnknownResource(self.resource.clone()))
    }
}
