//! Guest profiles with their AI-derived summaries and entities.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::{self, Record, str_field, string_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GuestPreferences {
    pub dining: Vec<String>,
    pub activities: Vec<String>,
    pub room_service: Vec<String>,
}

impl GuestPreferences {
    fn from_value(value: Option<Value>) -> Self {
        let map = record::object_or_empty(value);
        Self {
            dining: string_list(map.get("dining")),
            activities: string_list(map.get("activities")),
            room_service: string_list(map.get("roomService")),
        }
    }
}

/// A summary produced from past conversations with the guest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub summary_type: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    pub created_at: Option<String>,
}

impl GuestSummary {
    fn from_item(index: usize, record: &Map<String, Value>) -> Self {
        let id = match str_field(record, "id") {
            Some(id) => id.to_string(),
            None => format!("{}-{index}", str_field(record, "type").unwrap_or("summary")),
        };

        Self {
            id,
            summary_type: str_field(record, "type").unwrap_or("insight").to_string(),
            title: str_field(record, "title").unwrap_or("Summary").to_string(),
            content: str_field(record, "content").unwrap_or_default().to_string(),
            key_points: record
                .get("key_points")
                .filter(|v| v.is_array())
                .map(|v| string_list(Some(v))),
            confidence_score: record.get("confidence_score").and_then(Value::as_f64),
            created_at: str_field(record, "created_at").map(str::to_string),
        }
    }
}

/// A fact extracted about the guest (a person, a place, a preference).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestEntity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub category: String,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    pub created_at: Option<String>,
}

impl GuestEntity {
    fn from_item(index: usize, record: &Map<String, Value>) -> Self {
        Self {
            id: str_field(record, "id")
                .map(str::to_string)
                .unwrap_or_else(|| format!("entity-{index}")),
            name: str_field(record, "name").unwrap_or("Entity").to_string(),
            entity_type: str_field(record, "entity_type").unwrap_or("metadata").to_string(),
            category: str_field(record, "category").unwrap_or("general").to_string(),
            metadata: record::object_or_empty(record.get("metadata").cloned()),
            confidence_score: record.get("confidence_score").and_then(Value::as_f64),
            created_at: str_field(record, "created_at").map(str::to_string),
        }
    }
}

/// Maps every element of a JSON array, treating non-object elements as empty
/// objects so positions stay stable for the generated ids.
fn parse_items<T>(value: Option<Value>, parse: impl Fn(usize, &Map<String, Value>) -> T) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let empty = Map::new();
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse(index, item.as_object().unwrap_or(&empty)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestProfile {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: String,
    pub phone: String,
    pub nationality: String,
    pub language: String,
    pub vip_status: String,
    pub visit_count: i64,
    pub loyalty_points: i64,
    pub last_visit: Option<String>,
    pub room_preferences: String,
    pub dietary_restrictions: Option<String>,
    pub allergies: Option<String>,
    pub special_occasions: Option<String>,
    pub notes: Option<String>,
    pub photo: String,
    pub current_room: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub preferences: GuestPreferences,
    pub summary: Vec<GuestSummary>,
    pub entities: Vec<GuestEntity>,
    #[serde(rename = "created_at")]
    pub created_at: Option<String>,
    #[serde(rename = "updated_at")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GuestProfileRow {
    id: String,
    name: Option<String>,
    display_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    nationality: Option<String>,
    language: Option<String>,
    vip_status: Option<String>,
    visit_count: Option<i64>,
    loyalty_points: Option<i64>,
    last_visit: Option<String>,
    room_preferences: Option<String>,
    dietary_restrictions: Option<String>,
    allergies: Option<String>,
    special_occasions: Option<String>,
    notes: Option<String>,
    photo: Option<String>,
    current_room: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    preferences: Option<Value>,
    summary: Option<Value>,
    entities: Option<Value>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl From<GuestProfileRow> for GuestProfile {
    fn from(row: GuestProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_else(|| "Guest".to_string()),
            display_name: row.display_name,
            username: row.username,
            email: row.email.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            nationality: row.nationality.unwrap_or_default(),
            language: row.language.unwrap_or_default(),
            vip_status: row.vip_status.unwrap_or_else(|| "Standard".to_string()),
            visit_count: row.visit_count.unwrap_or(0),
            loyalty_points: row.loyalty_points.unwrap_or(0),
            last_visit: row.last_visit,
            room_preferences: row.room_preferences.unwrap_or_default(),
            dietary_restrictions: row.dietary_restrictions,
            allergies: row.allergies,
            special_occasions: row.special_occasions,
            notes: row.notes,
            photo: row.photo.unwrap_or_default(),
            current_room: row.current_room,
            check_in: row.check_in,
            check_out: row.check_out,
            preferences: GuestPreferences::from_value(row.preferences),
            summary: parse_items(row.summary, GuestSummary::from_item),
            entities: parse_items(row.entities, GuestEntity::from_item),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Entity for GuestProfile {
    type Key = String;

    fn key(&self) -> &String {
        &self.id
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        record::parse_timestamp(self.updated_at.as_deref().or(self.created_at.as_deref()))
    }
}

impl Record for GuestProfile {
    const KIND: EntityKind = EntityKind::GuestProfiles;

    fn from_row(row: Value) -> Result<Self> {
        let row: GuestProfileRow = record::decode::<Self, _>(row)?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_profile_gets_defaults() {
        let profile = GuestProfile::from_row(json!({"id": "g-1"})).unwrap();

        assert_eq!(profile.name, "Guest");
        assert_eq!(profile.vip_status, "Standard");
        assert_eq!(profile.visit_count, 0);
        assert_eq!(profile.email, "");
        assert_eq!(profile.preferences, GuestPreferences::default());
        assert!(profile.summary.is_empty());
        assert!(profile.entities.is_empty());
    }

    #[test]
    fn preferences_ignore_malformed_lists() {
        let profile = GuestProfile::from_row(json!({
            "id": "g-2",
            "preferences": {"dining": ["vegan", 4], "activities": "spa", "roomService": ["late checkout"]}
        }))
        .unwrap();

        assert_eq!(profile.preferences.dining, vec!["vegan"]);
        assert!(profile.preferences.activities.is_empty());
        assert_eq!(profile.preferences.room_service, vec!["late checkout"]);
    }

    #[test]
    fn summaries_and_entities_get_positional_ids() {
        let profile = GuestProfile::from_row(json!({
            "id": "g-3",
            "summary": [
                {"type": "stay", "content": "Prefers quiet rooms", "key_points": ["quiet"]},
                {"id": "s-9", "title": "Dining", "confidence_score": 0.8},
                "not an object"
            ],
            "entities": [
                {"name": "Anniversary", "entity_type": "event", "metadata": {"date": "06-12"}},
                42
            ]
        }))
        .unwrap();

        let ids: Vec<_> = profile.summary.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["stay-0", "s-9", "summary-2"]);
        assert_eq!(profile.summary[0].key_points, Some(vec!["quiet".to_string()]));
        assert_eq!(profile.summary[1].summary_type, "insight");
        assert_eq!(profile.summary[1].confidence_score, Some(0.8));
        assert_eq!(profile.summary[2].title, "Summary");

        assert_eq!(profile.entities[0].id, "entity-0");
        assert_eq!(profile.entities[0].metadata["date"], "06-12");
        assert_eq!(profile.entities[1].name, "Entity");
        assert_eq!(profile.entities[1].category, "general");
    }

    #[test]
    fn revision_falls_back_to_creation_time() {
        let profile = GuestProfile::from_row(json!({
            "id": "g-4",
            "created_at": "2024-02-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            profile.revision().map(|ts| ts.to_rfc3339()),
            Some("2024-02-01T00:00:00+00:00".to_string())
        );
    }
}
