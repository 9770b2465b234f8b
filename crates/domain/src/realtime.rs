//! Database change notifications as delivered by the realtime channel.

use common::EntityKind;
use live_collection::ChangeEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, Result};
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One `postgres_changes` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimePayload {
    pub table: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(alias = "type")]
    pub event_type: ChangeKind,
    #[serde(default, alias = "commit_timestamp")]
    pub commit_timestamp: Option<String>,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl RealtimePayload {
    pub fn kind(&self) -> Result<EntityKind> {
        Ok(EntityKind::from_table(&self.table)?)
    }

    /// Decodes the payload into a change event for `R`'s collection.
    ///
    /// Returns `Ok(None)` when there is no new row image: deletions are not
    /// applied to live collections.
    pub fn into_change<R: Record>(self) -> Result<Option<ChangeEvent<R>>> {
        if EntityKind::from_table(&self.table).ok() != Some(R::KIND) {
            return Err(DomainError::WrongTable {
                expected: R::KIND,
                actual: self.table,
            });
        }
        match self.new {
            Some(Value::Object(row)) if !row.is_empty() => {
                Ok(Some(ChangeEvent::upsert(R::from_row(Value::Object(row))?)))
            }
            _ => Ok(None),
        }
    }
}
