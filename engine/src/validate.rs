//! Payload validation against model schemas.
//!
//! The validator is a pure function over the schema: it never touches a
//! collection. It reports every violation it finds, in an order that depends
//! only on the schema and the key names, and hands back a normalized copy of
//! the payload ready for the collection.

use crate::{
    error::Result,
    schema::{FieldDef, FieldType, ModelSchema, BOOKKEEPING_FIELDS},
    Error, FieldViolation, Schema, ViolationKind,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

/// Whether a payload creates a record or patches an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Required fields must be present.
    Insert,
    /// Only supplied fields are checked.
    Update,
}

/// Outcome of checking one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    /// Every rule the payload broke
    pub violations: Vec<FieldViolation>,
    /// The payload with values coerced to their declared types
    pub normalized: Map<String, Value>,
}

impl Checked {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turn into the normalized payload, or a validation error.
    pub fn into_result(self) -> Result<Map<String, Value>> {
        if self.violations.is_empty() {
            Ok(self.normalized)
        } else {
            Err(Error::Validation(self.violations))
        }
    }
}

/// Checks payloads against the schema of their resource.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validate a payload, returning the normalized fields.
    pub fn validate(&self, resource: &str, candidate: &Value, mode: Mode) -> Result<Map<String, Value>> {
        self.check(resource, candidate, mode)?.into_result()
    }

    /// Check a payload and report violations alongside the normalized value.
    ///
    /// Fails only when the resource is unknown.
    pub fn check(&self, resource: &str, candidate: &Value, mode: Mode) -> Result<Checked> {
        let model = self
            .schema
            .model(resource)
            .ok_or_else(|| Error::UnknownResource(resource.to_string()))?;

        let Some(payload) = candidate.as_object() else {
            return Ok(Checked {
                violations: vec![FieldViolation::new(
                    "",
                    ViolationKind::TypeMismatch,
                    "body must be a JSON object",
                )],
                normalized: Map::new(),
            });
        };

        Ok(check_payload(model, payload, mode))
    }
}

fn check_payload(model: &ModelSchema, payload: &Map<String, Value>, mode: Mode) -> Checked {
    let mut violations = Vec::new();
    let mut normalized = Map::new();

    for field in &model.fields {
        let value = payload.get(&field.name);

        if field.auto_increment {
            if value.is_some() {
                violations.push(read_only(&field.name));
            }
            continue;
        }

        match value {
            None if field.required && mode == Mode::Insert => {
                violations.push(missing(&field.name));
            }
            None => {}
            Some(Value::Null) if field.required => violations.push(missing(&field.name)),
            Some(Value::Null) => {
                normalized.insert(field.name.clone(), Value::Null);
            }
            Some(value) => match normalize(field, value) {
                Ok(value) => {
                    normalized.insert(field.name.clone(), value);
                }
                Err(violation) => violations.push(violation),
            },
        }
    }

    let mut extra: Vec<(&String, &Value)> = payload
        .iter()
        .filter(|(key, _)| model.field(key).is_none())
        .collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));

    for (key, value) in extra {
        if BOOKKEEPING_FIELDS.contains(&key.as_str()) {
            violations.push(read_only(key));
        } else if model.strict {
            violations.push(FieldViolation::new(
                key.clone(),
                ViolationKind::UnknownField,
                format!("{key} is not a recognized field"),
            ));
        } else {
            normalized.insert(key.clone(), value.clone());
        }
    }

    Checked {
        violations,
        normalized,
    }
}

fn normalize(field: &FieldDef, value: &Value) -> std::result::Result<Value, FieldViolation> {
    let name = &field.name;
    match field.field_type {
        FieldType::Number => {
            let (n, normalized) = match value {
                Value::Number(n) => (n.as_f64(), value.clone()),
                Value::String(s) => {
                    let parsed = s.trim().parse::<f64>().ok().filter(|n| n.is_finite());
                    (parsed, parsed.map(number_value).unwrap_or(Value::Null))
                }
                _ => (None, Value::Null),
            };
            let n = n.ok_or_else(|| mismatch(name, "a number"))?;
            check_bounds(field, n, "")?;
            Ok(normalized)
        }
        FieldType::String => {
            let s = value.as_str().ok_or_else(|| mismatch(name, "a string"))?;
            check_bounds(field, s.chars().count() as f64, " characters")?;
            Ok(value.clone())
        }
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch(name, "a boolean")),
        },
        FieldType::Date => parse_date(value)
            .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .ok_or_else(|| mismatch(name, "a valid date")),
    }
}

fn check_bounds(field: &FieldDef, n: f64, unit: &str) -> std::result::Result<(), FieldViolation> {
    if let Some(min) = field.min.filter(|&min| n < min) {
        return Err(FieldViolation::new(
            field.name.clone(),
            ViolationKind::OutOfRange,
            format!("{} must be at least {min}{unit}", field.name),
        ));
    }
    if let Some(max) = field.max.filter(|&max| n > max) {
        return Err(FieldViolation::new(
            field.name.clone(),
            ViolationKind::OutOfRange,
            format!("{} must be at most {max}{unit}", field.name),
        ));
    }
    Ok(())
}

/// Integral values stay integers so they compare and print like the input.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Parse a date value: RFC 3339, `YYYY-MM-DD`, or epoch milliseconds.
pub(crate) fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn missing(field: &str) -> FieldViolation {
    FieldViolation::new(field, ViolationKind::MissingField, format!("{field} is required"))
}

fn read_only(field: &str) -> FieldViolation {
    FieldViolation::new(
        field,
        ViolationKind::ReadOnlyFieldViolation,
        format!("{field} is read-only"),
    )
}

fn mismatch(field: &str, expected: &str) -> FieldViolation {
    FieldViolation::new(
        field,
        ViolationKind::TypeMismatch,
        format!("{field} must be {expected}"),
    )
}
