//! # Mockbase Engine
//!
//! An embedded document store that turns declarative model schemas into
//! queryable, mutable, file-persisted collections of records.
//!
//! This crate is the core behind the mockbase REST backend. It handles
//! schemas, payload validation, auto-incrementing identifiers, chained filter
//! queries, pagination, ownership checks and whole-store snapshots.
//!
//! ## Design Principles
//!
//! - **Explicit schemas**: models are plain values, checked once when the
//!   [`Schema`] is built
//! - **Caller-supplied time**: every timestamp comes in as an argument, so
//!   the same inputs always produce the same records
//! - **One writer**: the [`Store`] owns every [`Collection`] and is the only
//!   thing that writes the snapshot file
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a flat JSON object of the model's fields plus bookkeeping:
//! - `id`, unique in its collection and never reused
//! - `createdBy`, the principal that created it (if any)
//! - `createdAt` / `updatedAt`, milliseconds since the epoch
//!
//! ### Validation
//!
//! The [`Validator`] checks a payload against its model and reports every
//! violated rule at once as [`FieldViolation`]s.
//!
//! ### Queries
//!
//! [`Collection::query`] starts a [`QueryBuilder`]; each `filter` call returns
//! a new, narrower view. [`paginate`] cuts a page out of the result.
//!
//! ## Quick Start
//!
//! ```rust
//! use mockbase_engine::{FieldDef, FieldType, Mode, ModelSchema, Operator, Schema, Store};
//! use serde_json::json;
//!
//! // 1. Define a schema
//! let schema = Schema::from_models([ModelSchema::new(
//!     "users",
//!     vec![
//!         FieldDef::auto_increment("id"),
//!         FieldDef::required("name", FieldType::String).min(2.0).max(50.0),
//!         FieldDef::optional("age", FieldType::Number).min(0.0).max(150.0),
//!     ],
//! )])
//! .unwrap();
//!
//! // 2. Create a store
//! let mut store = Store::new(schema);
//!
//! // 3. Validate and insert
//! let fields = store
//!     .validator()
//!     .validate("users", &json!({"name": "Ann", "age": 30}), Mode::Insert)
//!     .unwrap();
//! let record = store
//!     .collection_mut("users")
//!     .unwrap()
//!     .insert(fields, None, 1706745600000)
//!     .unwrap();
//! assert_eq!(record.id, 1);
//!
//! // 4. Query records
//! let users = store.collection("users").unwrap();
//! let adults = users.query().filter("age", Operator::Gte, 18).find();
//! assert_eq!(adults.len(), 1);
//! ```
//!
//! ## Persistence
//!
//! [`Store::open`] restores state from a [`StoreSnapshot`] file and rewrites
//! that file after every mutation made through [`Store::collection_mut`].

pub mod access;
pub mod collection;
pub mod error;
pub mod query;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod validate;

// Re-export main types at crate root
pub use access::{can_modify, ensure_can_modify};
pub use collection::{Collection, CollectionState};
pub use error::{Error, FieldViolation, ViolationKind};
pub use query::{paginate, Direction, Filter, Operator, Page, Paginated, QueryBuilder};
pub use record::Record;
pub use schema::{FieldDef, FieldType, ModelSchema, Schema, BOOKKEEPING_FIELDS};
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{CollectionWriter, Store};
pub use validate::{Checked, Mode, Validator};

/// Type aliases for clarity
pub type RecordId = u64;
pub type ResourceName = String;
pub type Principal = String;
pub type Timestamp = u64;
