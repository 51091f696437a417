//! Record types for storing data.

use crate::{Principal, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A data record in a collection.
///
/// Serializes as one flat JSON object: the bookkeeping keys next to the
/// model's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier within the collection, never reused
    pub id: RecordId,
    /// Principal that created the record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Principal>,
    /// When the record was created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the record was last updated (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// The model's fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a new record.
    pub fn new(
        id: RecordId,
        fields: Map<String, Value>,
        created_by: Option<Principal>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            created_by,
            created_at: timestamp,
            updated_at: timestamp,
            fields,
        }
    }

    /// Look up a field, bookkeeping keys included.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        match field {
            "id" => Some(Cow::Owned(Value::from(self.id))),
            "createdBy" => self
                .created_by
                .as_ref()
                .map(|p| Cow::Owned(Value::String(p.clone()))),
            "createdAt" => Some(Cow::Owned(Value::from(self.created_at))),
            "updatedAt" => Some(Cow::Owned(Value::from(self.updated_at))),
            _ => self.fields.get(field).map(Cow::Borrowed),
        }
    }

    /// Merge supplied fields over the existing ones.
    ///
    /// `id`, `createdBy` and `createdAt` never change. `updatedAt` always
    /// moves forward, even when the clock does not.
    pub fn merge(&mut self, patch: Map<String, Value>, timestamp: Timestamp) {
        for (key, value) in patch {
            self.fields.insert(key, value);
        }
        self.updated_at = timestamp.max(self.updated_at.saturating_add(1));
    }

    /// Render as a plain JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_record() {
        let record = Record::new(1, fields(json!({"name": "Ann"})), Some("u1".into()), 1000);

        assert_eq!(record.id, 1);
        assert_eq!(record.created_at, 1000);
        assert_eq!(record.updated_at, 1000);
        assert_eq!(record.get("name").unwrap().as_ref(), &json!("Ann"));
        assert_eq!(record.get("id").unwrap().as_ref(), &json!(1));
        assert_eq!(record.get("createdBy").unwrap().as_ref(), &json!("u1"));
        assert!(record.get("age").is_none());
    }

    #[test]
    fn merge_keeps_unsupplied_fields() {
        let mut record = Record::new(3, fields(json!({"name": "Ann", "age": 30})), None, 1000);
        record.merge(fields(json!({"age": 31})), 2000);

        assert_eq!(record.fields, fields(json!({"name": "Ann", "age": 31})));
        assert_eq!(record.id, 3);
        assert_eq!(record.created_at, 1000);
        assert_eq!(record.updated_at, 2000);
    }

    #[test]
    fn merge_advances_updated_at_on_stale_clock() {
        let mut record = Record::new(1, Map::new(), None, 5000);
        record.merge(Map::new(), 4000);
        assert_eq!(record.updated_at, 5001);
        record.merge(Map::new(), 5001);
        assert_eq!(record.updated_at, 5002);
    }

    #[test]
    fn merge_saturates_at_max_timestamp() {
        let mut record = Record::new(1, Map::new(), None, u64::MAX);
        record.merge(Map::new(), 1000);
        assert_eq!(record.updated_at, u64::MAX);
    }

    #[test]
    fn serializes_flat() {
        let record = Record::new(2, fields(json!({"name": "Bob"})), None, 1000);
        assert_eq!(
            record.to_value(),
            json!({"id": 2, "createdAt": 1000, "updatedAt": 1000, "name": "Bob"})
        );
    }

    #[test]
    fn serialization_roundtrip() {
        let record = Record::new(
            9,
            fields(json!({"name": "Ann", "age": 30, "tags": ["a"]})),
            Some("42".into()),
            1000,
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(record, parsed);
    }
}
