//! Filtering, sorting and pagination over a collection.
//!
//! A [`QueryBuilder`] is an immutable value: every `filter` call consumes the
//! builder and returns a new one with one more predicate. Nothing is
//! evaluated until a terminal (`find`, `first`, `count`, `paginate`) runs.

use crate::{validate::parse_date, Collection, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;

/// Comparison applied by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" | "eq" => Ok(Operator::Eq),
            "!=" | "<>" | "ne" => Ok(Operator::Ne),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "gte" => Ok(Operator::Gte),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "lte" => Ok(Operator::Lte),
            "contains" | "like" => Ok(Operator::Contains),
            other => Err(format!("unknown operator '{other}'")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether a record satisfies this predicate.
    ///
    /// A record without the field only matches `Ne`.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return self.op == Operator::Ne;
        };
        let actual = actual.as_ref();

        match self.op {
            Operator::Eq => values_equal(actual, &self.value),
            Operator::Ne => !values_equal(actual, &self.value),
            Operator::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Contains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                _ => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(_), Value::String(_)) if a != b => {
            matches!((parse_date(a), parse_date(b)), (Some(x), Some(y)) if x == y)
        }
        _ => a == b,
    }
}

/// Order two values: numbers numerically, dates chronologically, other
/// strings lexically. Anything else is unordered.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_date(a), parse_date(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

/// Requested page window. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page: usize,
    pub page_size: usize,
}

impl Page {
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Create a page window; zeros are clamped to 1.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Zero-based offset of the first item in the window.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the totals needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Cut one page out of an already filtered and ordered sequence.
///
/// Pages past the end are empty, not errors.
pub fn paginate<T>(items: Vec<T>, page: Page) -> Paginated<T> {
    let total = items.len();
    let total_pages = total.div_ceil(page.page_size);
    let items = items
        .into_iter()
        .skip(page.offset())
        .take(page.page_size)
        .collect();

    Paginated {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
        total_pages,
    }
}

/// Builder for querying records in a collection.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    collection: &'a Collection,
    filters: Vec<Filter>,
    sort: Option<(String, Direction)>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(collection: &'a Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            sort: None,
        }
    }

    /// Narrow the view with one more predicate (AND).
    pub fn filter(self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.with_filter(Filter::new(field, op, value))
    }

    /// Narrow the view with a prepared predicate.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sort results by a field. Ties and missing values keep insertion order,
    /// with missing values last.
    pub fn sort_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some((field.into(), direction));
        self
    }

    /// The predicates collected so far.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn matching(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.collection
            .iter()
            .filter(move |record| self.filters.iter().all(|f| f.matches(record)))
    }

    /// Get all matching records, in insertion order unless sorted.
    pub fn find(&self) -> Vec<&'a Record> {
        let mut records: Vec<&'a Record> = self.matching().collect();

        if let Some((field, direction)) = &self.sort {
            let mut keyed: Vec<(Option<SortKey>, &'a Record)> = records
                .into_iter()
                .map(|record| (record.get(field).map(|v| SortKey::new(&v)), record))
                .collect();

            keyed.sort_by(|(a, _), (b, _)| match (a, b) {
                (Some(x), Some(y)) => match direction {
                    Direction::Asc => x.cmp(y),
                    Direction::Desc => x.cmp(y).reverse(),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });

            records = keyed.into_iter().map(|(_, record)| record).collect();
        }

        records
    }

    /// Get the first matching record.
    pub fn first(&self) -> Option<&'a Record> {
        if self.sort.is_some() {
            self.find().into_iter().next()
        } else {
            self.matching().next()
        }
    }

    /// Count matching records.
    pub fn count(&self) -> usize {
        self.matching().count()
    }

    /// One page of the matching records.
    pub fn paginate(&self, page: Page) -> Paginated<&'a Record> {
        paginate(self.find(), page)
    }
}

/// Total ordering used for sorting. Values group by kind first
/// (null, booleans, numbers, dates, other strings, arrays and objects), then
/// order within the kind.
#[derive(Debug, Clone)]
enum SortKey {
    Null,
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    Composite,
}

impl SortKey {
    fn new(value: &Value) -> Self {
        match value {
            Value::Null => SortKey::Null,
            Value::Bool(b) => SortKey::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(SortKey::Composite, SortKey::Number),
            Value::String(s) => match parse_date(value) {
                Some(date) => SortKey::Date(date),
                None => SortKey::Text(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => SortKey::Composite,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Null => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Date(_) => 3,
            SortKey::Text(_) => 4,
            SortKey::Composite => 5,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn record(id: u64, value: Value) -> Record {
        let fields: Map<String, Value> = value.as_object().cloned().unwrap();
        Record::new(id, fields, None, 1000)
    }

    fn collection() -> Collection {
        let mut collection = Collection::new();
        collection.insert(json!({"name": "Ann", "age": 30}).as_object().cloned().unwrap(), None, 1);
        collection.insert(json!({"name": "Bob"}).as_object().cloned().unwrap(), None, 2);
        collection.insert(json!({"name": "Annette", "age": 12}).as_object().cloned().unwrap(), None, 3);
        collection
    }

    #[test]
    fn parse_operators() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Contains);
        assert!("~".parse::<Operator>().is_err());
    }

    #[test]
    fn missing_field_only_matches_not_equal() {
        let r = record(1, json!({"name": "Bob"}));
        assert!(!Filter::new("age", Operator::Gt, 10).matches(&r));
        assert!(!Filter::new("age", Operator::Eq, 10).matches(&r));
        assert!(Filter::new("age", Operator::Ne, 10).matches(&r));
    }

    #[test]
    fn numbers_compare_across_representations() {
        let r = record(1, json!({"score": 10}));
        assert!(Filter::new("score", Operator::Eq, 10.0).matches(&r));
        assert!(Filter::new("score", Operator::Gte, 10).matches(&r));
        assert!(Filter::new("score", Operator::Lt, 10.5).matches(&r));
    }

    #[test]
    fn dates_compare_chronologically() {
        let r = record(1, json!({"at": "2024-03-01T00:00:00.000Z"}));
        assert!(Filter::new("at", Operator::Gt, "2024-02-29").matches(&r));
        assert!(Filter::new("at", Operator::Lt, "2024-03-01T00:00:01Z").matches(&r));
        assert!(Filter::new("at", Operator::Eq, "2024-03-01").matches(&r));
        assert!(!Filter::new("at", Operator::Ne, "2024-03-01").matches(&r));
    }

    #[test]
    fn contains_on_strings_only() {
        let r = record(1, json!({"name": "Annette", "age": 12}));
        assert!(Filter::new("name", Operator::Contains, "nett").matches(&r));
        assert!(!Filter::new("name", Operator::Contains, "ANN").matches(&r));
        assert!(!Filter::new("age", Operator::Contains, "1").matches(&r));
    }

    #[test]
    fn bookkeeping_fields_are_filterable() {
        let r = record(4, json!({}));
        assert!(Filter::new("id", Operator::Eq, 4).matches(&r));
        assert!(Filter::new("createdAt", Operator::Eq, 1000).matches(&r));
    }

    #[test]
    fn chained_filters_compose_with_and() {
        let collection = collection();
        let base = collection.query().filter("name", Operator::Contains, "Ann");
        let narrowed = base.clone().filter("age", Operator::Lt, 20);

        assert_eq!(base.count(), 2);
        let found: Vec<u64> = narrowed.find().iter().map(|r| r.id).collect();
        assert_eq!(found, vec![3]);
    }

    #[test]
    fn sort_keeps_missing_last() {
        let collection = collection();
        let asc: Vec<u64> = collection
            .query()
            .sort_by("age", Direction::Asc)
            .find()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(asc, vec![3, 1, 2]);

        let desc: Vec<u64> = collection
            .query()
            .sort_by("age", Direction::Desc)
            .find()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(desc, vec![1, 3, 2]);
    }

    #[test]
    fn sort_mixed_types_groups_by_kind() {
        let mut collection = Collection::new();
        let values = [
            json!(2),
            json!("2024-01-02T00:00:00Z"),
            json!("x"),
            json!(1),
            json!(true),
            json!("2024-01-02 x"),
            json!("2024-01-01"),
            json!(null),
            json!("10"),
            json!(-3.5),
        ];
        for value in values {
            collection.insert(json!({ "x": value }).as_object().cloned().unwrap(), None, 1000);
        }
        collection.insert(Map::new(), None, 1000);

        let asc: Vec<u64> = collection
            .query()
            .sort_by("x", Direction::Asc)
            .find()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(asc, vec![8, 5, 10, 4, 1, 7, 2, 9, 6, 3, 11]);

        let desc: Vec<u64> = collection
            .query()
            .sort_by("x", Direction::Desc)
            .find()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(desc, vec![3, 6, 9, 2, 7, 1, 4, 10, 5, 8, 11]);
    }

    #[test]
    fn sort_many_mixed_values_does_not_panic() {
        let mut collection = Collection::new();
        for i in 0..300u64 {
            let value = match i % 4 {
                0 => json!(i % 7),
                1 => json!((i % 5).to_string()),
                2 => json!(format!("2024-01-0{}", i % 9 + 1)),
                _ => json!(format!("2024-01-0{} x", i % 9 + 1)),
            };
            collection.insert(json!({ "x": value }).as_object().cloned().unwrap(), None, i);
        }

        let sorted = collection.query().sort_by("x", Direction::Asc).find();
        assert_eq!(sorted.len(), 300);
    }

    #[test]
    fn pagination_windows() {
        let items: Vec<u32> = (1..=25).collect();

        let page = paginate(items.clone(), Page::default());
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let last = paginate(items.clone(), Page::new(3, 10));
        assert_eq!(last.items, (21..=25).collect::<Vec<_>>());

        let beyond = paginate(items, Page::new(4, 10));
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[test]
    fn pagination_of_empty_result() {
        let page = paginate(Vec::<u32>::new(), Page::new(1, 5));
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn page_clamps_zeros() {
        let page = Page::new(0, 0);
        assert_eq!(page, Page::new(1, 1));
        assert_eq!(page.offset(), 0);
    }
}
