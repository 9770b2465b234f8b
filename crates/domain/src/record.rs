//! Decoding database rows into dashboard records.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DomainError, Result};

/// A dashboard entity that can be decoded from a row of its table.
pub trait Record: Entity + Serialize + Sized {
    /// The collection this record belongs to.
    const KIND: EntityKind;

    /// Column holding the identity key.
    const IDENTITY: &'static str = "id";

    /// Decodes one row, filling in the dashboard's defaults for absent columns.
    ///
    /// Rows without a string identity are rejected.
    fn from_row(row: Value) -> Result<Self>;
}

/// Decodes a full table fetch, failing on the first bad row.
pub fn decode_rows<R: Record>(rows: Vec<Value>) -> Result<Vec<R>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            R::from_row(row).inspect_err(|err| {
                tracing::warn!(kind = %R::KIND, index, error = %err, "rejected row");
            })
        })
        .collect()
}

/// Checks the identity column and deserializes the row type.
pub(crate) fn decode<R: Record, T: DeserializeOwned>(row: Value) -> Result<T> {
    match row.get(R::IDENTITY) {
        Some(Value::String(id)) if !id.is_empty() => Ok(serde_json::from_value(row)?),
        _ => Err(DomainError::MissingIdentity {
            kind: R::KIND,
            field: R::IDENTITY,
        }),
    }
}

/// Parses an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Returns a string field of a loosely typed JSON object.
pub(crate) fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Returns a string-array field, or an empty list when absent or malformed.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Treats a non-object JSON value as an empty object.
pub(crate) fn object_or_empty(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
