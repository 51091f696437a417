//! List query parameters.
//!
//! `field=value` is an equality filter and `field__op=value` applies one of
//! `ne`, `gt`, `gte`, `lt`, `lte` or `contains`. `sort_by`, `order`,
//! `current_page` and `page_size` are reserved.

use crate::error::{AppError, Result};
use mockbase_engine::{Direction, FieldType, Filter, ModelSchema, Operator, Page};
use serde_json::{Number, Value};
use std::collections::HashMap;

const RESERVED: [&str; 4] = ["current_page", "page_size", "sort_by", "order"];

/// Parsed list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub filters: Vec<Filter>,
    pub sort: Option<(String, Direction)>,
    pub page: Page,
}

impl ListParams {
    pub fn from_query(model: &ModelSchema, query: HashMap<String, String>) -> Result<Self> {
        let page = Page::new(
            number_param(&query, "current_page")?.unwrap_or(1),
            number_param(&query, "page_size")?.unwrap_or(Page::DEFAULT_PAGE_SIZE),
        );

        let direction = match query.get("order").map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "order must be asc or desc, got '{other}'"
                )))
            }
        };
        let sort = query
            .get("sort_by")
            .filter(|f| !f.is_empty())
            .map(|f| (f.clone(), direction));

        // Sorted so filters apply in a stable order.
        let mut keys: Vec<&String> = query
            .keys()
            .filter(|k| !RESERVED.contains(&k.as_str()))
            .collect();
        keys.sort();

        let filters = keys
            .into_iter()
            .map(|key| {
                let (field, op) = split_key(key);
                let value = coerce(model, field, op, &query[key]);
                Filter::new(field, op, value)
            })
            .collect();

        Ok(Self {
            filters,
            sort,
            page,
        })
    }
}

fn number_param(query: &HashMap<String, String>, name: &str) -> Result<Option<usize>> {
    query
        .get(name)
        .map(|raw| {
            raw.parse()
                .map_err(|_| AppError::BadRequest(format!("{name} must be a positive integer")))
        })
        .transpose()
}

/// `age__gte` is `(age, Gte)`; a key without a known suffix is equality.
fn split_key(key: &str) -> (&str, Operator) {
    match key.rsplit_once("__") {
        Some((field, suffix @ ("ne" | "gt" | "gte" | "lt" | "lte" | "contains"))) => {
            (field, suffix.parse().unwrap_or(Operator::Eq))
        }
        _ => (key, Operator::Eq),
    }
}

/// Turn a query string value into the JSON type the field is declared with.
/// Values that do not parse stay strings.
fn coerce(model: &ModelSchema, field: &str, op: Operator, raw: &str) -> Value {
    if op == Operator::Contains {
        return Value::String(raw.to_string());
    }

    let field_type = match field {
        "id" | "createdAt" | "updatedAt" => Some(FieldType::Number),
        "createdBy" => Some(FieldType::String),
        _ => model.field(field).map(|f| f.field_type),
    };

    match field_type {
        Some(FieldType::Number) => parse_number(raw),
        Some(FieldType::Boolean) if raw.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Some(FieldType::Boolean) if raw.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => None,
    }
    .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
