//! Service requests opened by staff or the guest agent, with their update trail.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::{self, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ServiceRequestStatus {
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("in_progress" | "in-progress") => ServiceRequestStatus::InProgress,
            Some("completed") => ServiceRequestStatus::Completed,
            Some("cancelled" | "canceled") => ServiceRequestStatus::Cancelled,
            _ => ServiceRequestStatus::Pending,
        }
    }

    /// Completed and cancelled requests are closed.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ServiceRequestStatus::Pending | ServiceRequestStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRequestPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl ServiceRequestPriority {
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("low") => ServiceRequestPriority::Low,
            Some("high") => ServiceRequestPriority::High,
            Some("urgent") => ServiceRequestPriority::Urgent,
            _ => ServiceRequestPriority::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreatedBy {
    Agent,
    #[default]
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    #[default]
    Staff,
    Agent,
    System,
}

/// One entry of a request's update trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestUpdate {
    pub id: String,
    pub request_id: String,
    #[serde(default)]
    pub author_type: AuthorType,
    #[serde(default)]
    pub staff_profile_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: Option<ServiceRequestStatus>,
    #[serde(default)]
    pub visible_to_guest: bool,
    pub added_at: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    pub id: String,
    pub guest_id: Option<String>,
    pub guest_name: Option<String>,
    pub room_number: Option<String>,
    pub request_type: Option<String>,
    pub summary: String,
    pub status: ServiceRequestStatus,
    pub priority: ServiceRequestPriority,
    pub eta: Option<String>,
    pub created_by: CreatedBy,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: Map<String, Value>,
    /// Oldest first.
    pub updates: Vec<ServiceRequestUpdate>,
    pub latest_update: Option<ServiceRequestUpdate>,
    pub assigned_staff: Option<String>,
    pub ai_summary: Option<String>,
    pub source: Option<String>,
    pub resolved_at: Option<String>,
    pub follow_up: Map<String, Value>,
    pub scheduled: bool,
    pub scheduled_for: Option<String>,
    pub last_reviewer_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileRef {
    display_name: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl ProfileRef {
    fn display(&self) -> Option<String> {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        non_blank(&self.display_name)
            .or_else(|| non_blank(&self.username))
            .or_else(|| {
                let parts: Vec<String> = [&self.first_name, &self.last_name]
                    .into_iter()
                    .filter_map(non_blank)
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceRequestRow {
    id: String,
    guest_id: Option<String>,
    room_number: Option<String>,
    request_type: Option<String>,
    summary: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    eta: Option<String>,
    created_by: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    metadata: Option<Value>,
    assigned_staff: Option<String>,
    ai_summary: Option<String>,
    source: Option<String>,
    resolved_at: Option<String>,
    follow_up: Option<Value>,
    scheduled: Option<bool>,
    scheduled_for: Option<String>,
    last_reviewer_id: Option<String>,
    profiles: Option<ProfileRef>,
    service_request_updates: Option<Value>,
}

/// Decodes the embedded update trail, skipping malformed entries, ordered by
/// `added_at`.
fn parse_updates(value: Option<Value>) -> Vec<ServiceRequestUpdate> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut updates: Vec<ServiceRequestUpdate> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    updates.sort_by(|a, b| {
        let a_ts = record::parse_timestamp(Some(a.added_at.as_str()));
        let b_ts = record::parse_timestamp(Some(b.added_at.as_str()));
        a_ts.cmp(&b_ts)
    });
    updates
}

impl From<ServiceRequestRow> for ServiceRequest {
    fn from(row: ServiceRequestRow) -> Self {
        let updates = parse_updates(row.service_request_updates);
        let latest_update = updates.last().cloned();
        let created_at = row.created_at.unwrap_or_default();
        let updated_at = row.updated_at.unwrap_or_else(|| created_at.clone());
        let created_by = match row.created_by.as_deref() {
            Some("agent") => CreatedBy::Agent,
            _ => CreatedBy::Staff,
        };

        Self {
            id: row.id,
            guest_id: row.guest_id,
            guest_name: row.profiles.as_ref().and_then(ProfileRef::display),
            room_number: row.room_number,
            request_type: row.request_type,
            summary: row.summary.unwrap_or_default(),
            status: ServiceRequestStatus::from_column(row.status.as_deref()),
            priority: ServiceRequestPriority::from_column(row.priority.as_deref()),
            eta: row.eta,
            created_by,
            created_at,
            updated_at,
            metadata: record::object_or_empty(row.metadata),
            updates,
            latest_update,
            assigned_staff: row.assigned_staff,
            ai_summary: row.ai_summary,
            source: row.source,
            resolved_at: row.resolved_at,
            follow_up: record::object_or_empty(row.follow_up),
            scheduled: row.scheduled.unwrap_or(false),
            scheduled_for: row.scheduled_for,
            last_reviewer_id: row.last_reviewer_id,
        }
    }
}

impl Entity for ServiceRequest {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        record::parse_timestamp(Some(self.updated_at.as_str()))
    }
}

impl Record for ServiceRequest {
    const KIND: EntityKind = EntityKind::ServiceRequests;

    fn from_row(row: Value) -> Result<Self> {
        let row: ServiceRequestRow = record::decode::<Self, _>(row)?;
        Ok(row.into())
    }
}
