use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text form used for index documents and identifier terms
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Date(d) => Some(d.to_rfc3339()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Ordering between comparable values; `None` for mismatched types or nulls
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Integer(a), FieldValue::Number(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Number(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// An instance of a data model as seen by the indexing layer
pub trait Entity {
    fn model_name(&self) -> &str;

    /// `None` when the instance has no such attribute at all
    fn attribute(&self, name: &str) -> Option<FieldValue>;
}

impl<E: Entity + ?Sized> Entity for &E {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn attribute(&self, name: &str) -> Option<FieldValue> {
        (**self).attribute(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub model: String,
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new(model: &str) -> Self {
        Record {
            model: model.to_string(),
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }
}

impl Entity for Record {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn attribute(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn is_upsert(&self) -> bool {
        !matches!(self, MutationKind::Delete)
    }
}

/// One committed change, as delivered by the storage engine after a flush
#[derive(Debug, Clone)]
pub struct Mutation<E> {
    pub kind: MutationKind,
    pub entity: E,
}

impl<E> Mutation<E> {
    pub fn insert(entity: E) -> Self {
        Mutation { kind: MutationKind::Insert, entity }
    }

    pub fn update(entity: E) -> Self {
        Mutation { kind: MutationKind::Update, entity }
    }

    pub fn delete(entity: E) -> Self {
        Mutation { kind: MutationKind::Delete, entity }
    }
}
