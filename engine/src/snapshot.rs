//! Snapshot types for persisting and restoring store state.
//!
//! A snapshot is the whole store: every collection's records in insertion
//! order plus its id counter. It is written as one JSON document and read
//! back verbatim, so `from_json(to_json(s)) == s`.

use crate::{collection::CollectionState, error::Result, Error, ResourceName, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the store state.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Collection state by resource name
    pub collections: BTreeMap<ResourceName, CollectionState>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            collections: BTreeMap::new(),
        }
    }

    /// Add a collection to the snapshot.
    pub fn add_collection(&mut self, name: impl Into<ResourceName>, state: CollectionState) {
        self.collections.insert(name.into(), state);
    }

    /// Get a collection from the snapshot.
    pub fn get_collection(&self, name: &str) -> Option<&CollectionState> {
        self.collections.get(name)
    }

    /// Count total records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(|c| c.records.len()).sum()
    }

    /// Check that every collection in the snapshot is known to the schema.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for name in self.collections.keys() {
            if schema.model(name).is_none() {
                return Err(Error::InvalidSnapshot(format!(
                    "collection '{name}' is not declared by any model"
                )));
            }
        }
        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Persistence(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Persistence(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        // Validate format version
        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Read a snapshot file. A missing file is `Ok(None)`.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(format!("{}: {e}", path.display()))),
        }
    }

    /// Write the snapshot to `path`.
    ///
    /// The JSON goes to a sibling temporary file first and is renamed over
    /// the target, so readers see either the old or the new snapshot.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        fs::write(&tmp, self.to_json_pretty()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Snapshot format version
    pub format_version: u32,
    /// Number of collections
    pub collection_count: usize,
    /// Total record count
    pub record_count: usize,
}

impl From<&StoreSnapshot> for SnapshotMetadata {
    fn from(snapshot: &StoreSnapshot) -> Self {
        Self {
            format_version: snapshot.format_version,
            collection_count: snapshot.collections.len(),
            record_count: snapshot.record_count(),
        }
    }
}
