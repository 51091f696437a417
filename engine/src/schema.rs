//! Schema definition.
//!
//! A [`Schema`] is the set of [`ModelSchema`]s the store serves, one per
//! resource. Schemas are built explicitly (or deserialized from model files)
//! and checked once, when a [`Store`](crate::Store) is constructed.

use crate::{error::Result, Error, ResourceName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Keys the store maintains on every record. Callers never write them.
pub const BOOKKEEPING_FIELDS: [&str; 4] = ["id", "createdBy", "createdAt", "updatedAt"];

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Date,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Number => write!(f, "number"),
            FieldType::String => write!(f, "string"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

/// Definition of a field in a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether this field must be present on insert
    #[serde(default)]
    pub required: bool,
    /// Inclusive lower bound: value for numbers, length for strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound: value for numbers, length for strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Whether the store assigns this field from the collection counter
    #[serde(default)]
    pub auto_increment: bool,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            min: None,
            max: None,
            auto_increment: false,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, field_type)
        }
    }

    /// Create the store-assigned numeric key field.
    pub fn auto_increment(name: impl Into<String>) -> Self {
        Self {
            auto_increment: true,
            ..Self::optional(name, FieldType::Number)
        }
    }

    /// Builder-style inclusive lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Builder-style inclusive upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn check(&self, model: &str) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidSchema(format!("{model}.{}: {msg}", self.name)));

        if self.name.is_empty() {
            return Err(Error::InvalidSchema(format!("{model}: field name is empty")));
        }
        if self.auto_increment && self.field_type != FieldType::Number {
            return invalid("auto-increment field must be a number".into());
        }
        if BOOKKEEPING_FIELDS.contains(&self.name.as_str())
            && !(self.name == "id" && self.auto_increment)
        {
            return invalid("name is reserved for record bookkeeping".into());
        }
        let bounded = self.min.is_some() || self.max.is_some();
        if bounded && !matches!(self.field_type, FieldType::Number | FieldType::String) {
            return invalid(format!("bounds are not supported on {} fields", self.field_type));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return invalid(format!("min {min} is greater than max {max}"));
            }
        }
        if self.field_type == FieldType::String && self.min.is_some_and(|m| m < 0.0) {
            return invalid("string length bound cannot be negative".into());
        }
        Ok(())
    }
}

/// Schema for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    /// Resource name, unique across the store
    #[serde(rename = "resource")]
    pub resource_name: ResourceName,
    /// Field definitions, in declaration order
    pub fields: Vec<FieldDef>,
    /// Reject fields the model does not declare
    #[serde(default)]
    pub strict: bool,
    /// Records inserted when the store starts without a snapshot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed: Vec<Map<String, Value>>,
}

impl ModelSchema {
    /// Create a new model schema.
    pub fn new(resource_name: impl Into<ResourceName>, fields: Vec<FieldDef>) -> Self {
        Self {
            resource_name: resource_name.into(),
            fields,
            strict: false,
            seed: Vec::new(),
        }
    }

    /// Builder-style switch to reject undeclared fields.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Builder-style seed record.
    pub fn with_seed(mut self, record: Map<String, Value>) -> Self {
        self.seed.push(record);
        self
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The auto-increment field, if the model declares one.
    pub fn auto_increment_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.auto_increment)
    }

    fn check(&self) -> Result<()> {
        let model = &self.resource_name;
        if model.is_empty() {
            return Err(Error::InvalidSchema("resource name is empty".into()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            field.check(model)?;
            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "{model}: duplicate field '{}'",
                    field.name
                )));
            }
        }

        if self.fields.iter().filter(|f| f.auto_increment).count() > 1 {
            return Err(Error::InvalidSchema(format!(
                "{model}: at most one auto-increment field is allowed"
            )));
        }
        Ok(())
    }
}

/// Schema for the entire store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    models: Vec<ModelSchema>,
    by_name: HashMap<ResourceName, usize>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from model declarations, checking every invariant.
    pub fn from_models(models: impl IntoIterator<Item = ModelSchema>) -> Result<Self> {
        let mut schema = Self::new();
        for model in models {
            schema.add_model(model)?;
        }
        Ok(schema)
    }

    /// Add a model to the schema.
    pub fn add_model(&mut self, model: ModelSchema) -> Result<&mut Self> {
        model.check()?;
        if self.by_name.contains_key(&model.resource_name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate resource '{}'",
                model.resource_name
            )));
        }
        self.by_name
            .insert(model.resource_name.clone(), self.models.len());
        self.models.push(model);
        Ok(self)
    }

    /// Builder-style method to add a model.
    pub fn with_model(mut self, model: ModelSchema) -> Result<Self> {
        self.add_model(model)?;
        Ok(self)
    }

    /// Get a model schema by resource name.
    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.by_name.get(name).map(|&i| &self.models[i])
    }

    /// All models in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.iter()
    }

    /// Resource names in declaration order.
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.resource_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> ModelSchema {
        ModelSchema::new(
            "users",
            vec![
                FieldDef::auto_increment("id"),
                FieldDef::required("name", FieldType::String).min(2.0).max(50.0),
                FieldDef::optional("age", FieldType::Number).min(0.0).max(150.0),
            ],
        )
    }

    #[test]
    fn build_valid_schema() {
        let schema = Schema::new().with_model(users()).unwrap();
        assert_eq!(schema.len(), 1);

        let model = schema.model("users").unwrap();
        assert_eq!(model.auto_increment_field().unwrap().name, "id");
        assert_eq!(model.field("age").unwrap().max, Some(150.0));
        assert!(schema.model("posts").is_none());
    }

    #[test]
    fn reject_duplicate_resource() {
        let result = Schema::from_models([users(), users()]);
        assert!(matches!(result, Err(Error::InvalidSchema(m)) if m.contains("duplicate resource")));
    }

    #[test]
    fn reject_two_auto_increment_fields() {
        let model = ModelSchema::new(
            "things",
            vec![FieldDef::auto_increment("id"), FieldDef::auto_increment("seq")],
        );
        assert!(matches!(
            Schema::from_models([model]),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn reject_non_numeric_auto_increment() {
        let mut field = FieldDef::optional("code", FieldType::String);
        field.auto_increment = true;
        let model = ModelSchema::new("things", vec![field]);
        assert!(Schema::from_models([model]).is_err());
    }

    #[test]
    fn reject_reserved_names() {
        let model = ModelSchema::new("things", vec![FieldDef::optional("createdAt", FieldType::Date)]);
        assert!(Schema::from_models([model]).is_err());

        let model = ModelSchema::new("things", vec![FieldDef::optional("id", FieldType::Number)]);
        assert!(Schema::from_models([model]).is_err());
    }

    #[test]
    fn reject_inverted_or_misplaced_bounds() {
        let model = ModelSchema::new(
            "things",
            vec![FieldDef::optional("n", FieldType::Number).min(5.0).max(1.0)],
        );
        assert!(Schema::from_models([model]).is_err());

        let model = ModelSchema::new(
            "things",
            vec![FieldDef::optional("flag", FieldType::Boolean).max(1.0)],
        );
        assert!(Schema::from_models([model]).is_err());
    }

    #[test]
    fn reject_duplicate_field() {
        let model = ModelSchema::new(
            "things",
            vec![
                FieldDef::optional("a", FieldType::String),
                FieldDef::optional("a", FieldType::Number),
            ],
        );
        assert!(Schema::from_models([model]).is_err());
    }

    #[test]
    fn deserialize_declaration() {
        let model: ModelSchema = serde_json::from_value(json!({
            "resource": "users",
            "fields": [
                {"name": "id", "type": "number", "autoIncrement": true},
                {"name": "name", "type": "string", "required": true, "min": 2, "max": 50},
                {"name": "birthday", "type": "date"}
            ],
            "seed": [{"name": "Admin"}]
        }))
        .unwrap();

        assert_eq!(model.resource_name, "users");
        assert!(!model.strict);
        assert_eq!(model.seed.len(), 1);
        assert_eq!(model.field("name").unwrap().min, Some(2.0));
        assert_eq!(model.field("birthday").unwrap().field_type, FieldType::Date);
        assert!(Schema::from_models([model]).is_ok());
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::Number.to_string(), "number");
        assert_eq!(FieldType::Date.to_string(), "date");
    }
}
