//! Guest requests raised through the concierge chat.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::record::{self, Record};

/// Progress of a guest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl RequestStatus {
    /// Reads a status column, falling back to `Pending` for unknown values.
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("in-progress" | "in_progress") => RequestStatus::InProgress,
            Some("completed") => RequestStatus::Completed,
            _ => RequestStatus::Pending,
        }
    }

    /// Returns the status as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a guest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl RequestPriority {
    /// Reads a priority column, falling back to `Normal` for unknown values.
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("high") => RequestPriority::High,
            Some("low") => RequestPriority::Low,
            _ => RequestPriority::Normal,
        }
    }
}

/// Who wrote a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    Guest,
    Staff,
}

/// One message of the conversation attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: MessageSender,
    pub message: String,
    pub timestamp: String,
}

/// A guest request as shown on the requests board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRequest {
    pub id: String,
    pub room_number: String,
    pub guest_name: String,
    pub guest_id: Option<String>,
    #[serde(rename = "type")]
    pub request_type: String,
    pub status: RequestStatus,
    pub priority: RequestPriority,
    pub timestamp: String,
    pub message: String,
    pub scheduled: bool,
    pub scheduled_for: Option<String>,
    pub assigned_staff: Option<String>,
    pub ai_suggestion: Option<String>,
    pub conversation: Vec<ConversationMessage>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuestRequestRow {
    id: String,
    guest_id: Option<String>,
    room_number: Option<String>,
    guest_name: Option<String>,
    request_type: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    message: Option<String>,
    conversation: Option<Value>,
    scheduled: Option<bool>,
    scheduled_for: Option<String>,
    assigned_staff: Option<String>,
    ai_suggestion: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    timestamp: Option<String>,
}

/// Keeps only well-formed `{sender, message, timestamp}` entries.
fn parse_conversation(value: Option<Value>) -> Vec<ConversationMessage> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

impl From<GuestRequestRow> for GuestRequest {
    fn from(row: GuestRequestRow) -> Self {
        let timestamp = row
            .timestamp
            .clone()
            .or_else(|| row.created_at.clone())
            .unwrap_or_default();

        Self {
            id: row.id,
            room_number: row.room_number.unwrap_or_else(|| "—".to_string()),
            guest_name: row.guest_name.unwrap_or_else(|| "Guest".to_string()),
            guest_id: row.guest_id,
            request_type: row.request_type.unwrap_or_else(|| "general".to_string()),
            status: RequestStatus::from_column(row.status.as_deref()),
            priority: RequestPriority::from_column(row.priority.as_deref()),
            timestamp,
            message: row.message.unwrap_or_default(),
            scheduled: row.scheduled.unwrap_or(false),
            scheduled_for: row.scheduled_for,
            assigned_staff: row.assigned_staff,
            ai_suggestion: row.ai_suggestion,
            conversation: parse_conversation(row.conversation),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Entity for GuestRequest {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        record::parse_timestamp(self.updated_at.as_deref())
    }
}

impl Record for GuestRequest {
    const KIND: EntityKind = EntityKind::GuestRequests;

    fn from_row(row: Value) -> Result<Self> {
        let row: GuestRequestRow = record::decode::<Self, _>(row)?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;
    use serde_json::json;

    #[test]
    fn full_row_decodes() {
        let request = GuestRequest::from_row(json!({
            "id": "req-001",
            "room_number": "2104",
            "guest_name": "James Wilson",
            "request_type": "room-service",
            "status": "in-progress",
            "priority": "high",
            "message": "Extra towels please",
            "scheduled": false,
            "assigned_staff": "Maria Garcia",
            "conversation": [
                {"sender": "guest", "message": "Extra towels please", "timestamp": "2024-03-01T10:00:00Z"}
            ],
            "timestamp": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:05:00Z"
        }))
        .unwrap();

        assert_eq!(request.key(), "req-001");
        assert_eq!(request.status, RequestStatus::InProgress);
        assert_eq!(request.priority, RequestPriority::High);
        assert_eq!(request.conversation.len(), 1);
        assert!(request.revision().is_some());
    }

    #[test]
    fn sparse_row_gets_defaults() {
        let request = GuestRequest::from_row(json!({
            "id": "req-002",
            "created_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap();

        assert_eq!(request.room_number, "—");
        assert_eq!(request.guest_name, "Guest");
        assert_eq!(request.request_type, "general");
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.priority, RequestPriority::Normal);
        assert_eq!(request.timestamp, "2024-03-01T09:00:00Z");
        assert!(!request.scheduled);
        assert!(request.conversation.is_empty());
    }

    #[test]
    fn unknown_status_and_priority_fall_back() {
        let request = GuestRequest::from_row(json!({
            "id": "req-003",
            "status": "escalated",
            "priority": "urgent"
        }))
        .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.priority, RequestPriority::Normal);
    }

    #[test]
    fn malformed_conversation_entries_are_dropped() {
        let request = GuestRequest::from_row(json!({
            "id": "req-004",
            "conversation": [
                {"sender": "robot", "message": "hi", "timestamp": "t"},
                {"sender": "staff", "message": 5, "timestamp": "t"},
                {"sender": "staff", "message": "On our way", "timestamp": "t"},
                "garbage"
            ]
        }))
        .unwrap();

        assert_eq!(request.conversation.len(), 1);
        assert_eq!(request.conversation[0].sender, MessageSender::Staff);
    }

    #[test]
    fn row_without_identity_is_rejected() {
        let err = GuestRequest::from_row(json!({"id": 42, "status": "pending"})).unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingIdentity {
                kind: EntityKind::GuestRequests,
                field: "id"
            }
        ));
    }

    #[test]
    fn serializes_like_the_dashboard_view_model() {
        let request = GuestRequest::from_row(json!({"id": "req-005", "status": "in_progress"})).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["roomNumber"], "—");
        assert_eq!(json["type"], "general");
        assert_eq!(json["status"], "in-progress");
    }
}
