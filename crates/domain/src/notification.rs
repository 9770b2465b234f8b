//! Staff notifications feed.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::record::{self, Record};

/// A notification in the staff feed. The feed shows the most recently
/// touched notification first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    pub read: bool,
    pub request_id: Option<String>,
    pub room_number: Option<String>,
    pub guest_id: Option<String>,
    pub sender: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NotificationRow {
    id: String,
    #[serde(rename = "type")]
    notification_type: Option<String>,
    title: Option<String>,
    message: Option<String>,
    timestamp: Option<String>,
    read: Option<bool>,
    request_id: Option<String>,
    room_number: Option<String>,
    guest_id: Option<String>,
    sender: Option<String>,
    created_at: Option<String>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let timestamp = row
            .timestamp
            .or_else(|| row.created_at.clone())
            .unwrap_or_default();

        Self {
            id: row.id,
            notification_type: row.notification_type.unwrap_or_else(|| "info".to_string()),
            title: row.title.unwrap_or_default(),
            message: row.message.unwrap_or_default(),
            timestamp,
            read: row.read.unwrap_or(false),
            request_id: row.request_id,
            room_number: row.room_number,
            guest_id: row.guest_id,
            sender: row.sender.unwrap_or_else(|| "System".to_string()),
            created_at: row.created_at,
        }
    }
}

impl Entity for Notification {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }

    // Notifications are never edited server-side except for `read`, so the
    // creation time is the only revision available.
    fn revision(&self) -> Option<DateTime<Utc>> {
        record::parse_timestamp(self.created_at.as_deref())
    }
}

impl Record for Notification {
    const KIND: EntityKind = EntityKind::Notifications;

    fn from_row(row: Value) -> Result<Self> {
        let row: NotificationRow = record::decode::<Self, _>(row)?;
        Ok(row.into())
    }
}
