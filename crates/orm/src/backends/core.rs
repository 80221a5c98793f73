//! Core value and statement types shared by the compiler and the connection provider
//!
//! `DatabaseValue` is the parameter type handed to the driver, `Statement` pairs
//! SQL text with its positional parameters, and the row helpers turn driver rows
//! into attribute maps.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value as JsonValue};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row, TypeInfo, ValueRef};

use crate::error::{ModelError, ModelResult};

/// Field name to value mapping for one row
pub type Attributes = Map<String, JsonValue>;

/// Unwrap a JSON object into an attribute map
pub fn to_attributes(value: JsonValue) -> ModelResult<Attributes> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(ModelError::Serialization(format!(
            "expected a JSON object of attributes, got {}",
            other
        ))),
    }
}

/// Storage format for timestamp columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way timestamp columns store it
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int64(i) => JsonValue::Number(Number::from(*i)),
            DatabaseValue::Float64(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(
                b.iter().map(|&x| JsonValue::Number(Number::from(x))).collect(),
            ),
        }
    }

    /// Convert from a JSON value. Arrays and objects are stored as their JSON text.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => DatabaseValue::Null,
            JsonValue::Bool(b) => DatabaseValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DatabaseValue::Int64(i)
                } else {
                    DatabaseValue::Float64(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => DatabaseValue::String(s.clone()),
            other => DatabaseValue::String(other.to_string()),
        }
    }
}

impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => write!(f, "NULL"),
            DatabaseValue::Bool(b) => write!(f, "{}", b),
            DatabaseValue::Int64(i) => write!(f, "{}", i),
            DatabaseValue::Float64(v) => write!(f, "{}", v),
            DatabaseValue::String(s) => write!(f, "'{}'", s),
            DatabaseValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::from_json(&value)
    }
}

impl From<&JsonValue> for DatabaseValue {
    fn from(value: &JsonValue) -> Self {
        DatabaseValue::from_json(value)
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int64(value as i64)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<u32> for DatabaseValue {
    fn from(value: u32) -> Self {
        DatabaseValue::Int64(value as i64)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(value: DateTime<Utc>) -> Self {
        DatabaseValue::String(format_timestamp(value))
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DatabaseValue::Null)
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
    redacted: BTreeSet<usize>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            redacted: BTreeSet::new(),
        }
    }

    /// Append a parameter
    pub fn bind(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Append a parameter whose value must never appear in logs
    pub fn bind_redacted(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.redacted.insert(self.params.len());
        self.params.push(value.into());
        self
    }

    pub(crate) fn push(&mut self, value: DatabaseValue, redact: bool) {
        if redact {
            self.redacted.insert(self.params.len());
        }
        self.params.push(value);
    }

    /// Whether the parameter at `index` is redacted in logs
    pub fn is_redacted(&self, index: usize) -> bool {
        self.redacted.contains(&index)
    }

    /// Parameters rendered for logging, sensitive values masked
    pub fn params_for_log(&self) -> String {
        let rendered: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if self.is_redacted(i) {
                    "<redacted>".to_string()
                } else {
                    value.to_string()
                }
            })
            .collect();
        format!("[{}]", rendered.join(", "))
    }

    /// Build the driver query with every parameter bound positionally
    pub(crate) fn to_query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for value in &self.params {
            query = match value {
                DatabaseValue::Null => query.bind(None::<String>),
                DatabaseValue::Bool(b) => query.bind(*b),
                DatabaseValue::Int64(i) => query.bind(*i),
                DatabaseValue::Float64(f) => query.bind(*f),
                DatabaseValue::String(s) => query.bind(s.as_str()),
                DatabaseValue::Bytes(b) => query.bind(b.as_slice()),
            };
        }
        query
    }
}

/// Convert a driver row into an attribute map keyed by column name
pub(crate) fn row_to_attributes(row: &AnyRow) -> ModelResult<Attributes> {
    let mut attributes = Attributes::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        attributes.insert(column.name().to_string(), value);
    }
    Ok(attributes)
}

/// Decode one column, trying the value kinds the `Any` driver can carry
pub(crate) fn decode_column(row: &AnyRow, index: usize) -> ModelResult<JsonValue> {
    // The Any driver reports NULL through the value's type, not `is_null`
    if row.try_get_raw(index)?.type_info().is_null() {
        return Ok(JsonValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(JsonValue::from).unwrap_or(JsonValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map(JsonValue::Bool).unwrap_or(JsonValue::Null));
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.map(JsonValue::String).unwrap_or(JsonValue::Null));
    }
    let bytes = row
        .try_get::<Option<Vec<u8>>, _>(index)
        .map_err(|e| ModelError::Serialization(format!("Failed to decode column {}: {}", index, e)))?;
    Ok(bytes
        .map(|b| DatabaseValue::Bytes(b).to_json())
        .unwrap_or(JsonValue::Null))
}
