//! Rooms and their in-room controls.

use chrono::{DateTime, Utc};
use common::EntityKind;
use live_collection::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::record::{self, Record};

const DEFAULT_TEMPERATURE: f64 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Occupied,
    #[default]
    Vacant,
    Maintenance,
}

impl RoomStatus {
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("occupied") => RoomStatus::Occupied,
            Some("maintenance") => RoomStatus::Maintenance,
            _ => RoomStatus::Vacant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HousekeepingStatus {
    #[serde(rename = "cleaned")]
    Cleaned,
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress")]
    InProgress,
}

impl HousekeepingStatus {
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw {
            Some("cleaned") => HousekeepingStatus::Cleaned,
            Some("in progress" | "in-progress" | "in_progress") => HousekeepingStatus::InProgress,
            _ => HousekeepingStatus::Pending,
        }
    }
}

/// An entry of the occupying guest's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoomScheduleEntry {
    pub time: String,
    pub activity: String,
    pub notes: String,
}

/// A room as shown on the room-control board. Rooms are keyed by their number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_number: String,
    pub room_type: Option<String>,
    pub floor_number: Option<i32>,
    pub status: RoomStatus,
    pub guest_name: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub temperature: f64,
    pub lights: bool,
    pub do_not_disturb: bool,
    pub ac_on: bool,
    pub curtains_open: bool,
    pub housekeeping_status: HousekeepingStatus,
    pub minibar_restocked: bool,
    pub maintenance_needed: bool,
    pub guest_schedule: Vec<RoomScheduleEntry>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoomRow {
    room_number: String,
    room_type: Option<String>,
    floor_number: Option<i32>,
    status: Option<String>,
    guest_name: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    temperature: Option<f64>,
    lights: Option<bool>,
    do_not_disturb: Option<bool>,
    ac_on: Option<bool>,
    curtains_open: Option<bool>,
    housekeeping_status: Option<String>,
    minibar_restocked: Option<bool>,
    maintenance_needed: Option<bool>,
    guest_schedule: Option<Value>,
    updated_at: Option<String>,
}

fn parse_schedule(value: Option<Value>) -> Vec<RoomScheduleEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            room_number: row.room_number,
            room_type: row.room_type,
            floor_number: row.floor_number,
            status: RoomStatus::from_column(row.status.as_deref()),
            guest_name: row.guest_name,
            check_in: row.check_in,
            check_out: row.check_out,
            temperature: row.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            lights: row.lights.unwrap_or(false),
            do_not_disturb: row.do_not_disturb.unwrap_or(false),
            ac_on: row.ac_on.unwrap_or(false),
            curtains_open: row.curtains_open.unwrap_or(false),
            housekeeping_status: HousekeepingStatus::from_column(row.housekeeping_status.as_deref()),
            minibar_restocked: row.minibar_restocked.unwrap_or(false),
            maintenance_needed: row.maintenance_needed.unwrap_or(false),
            guest_schedule: parse_schedule(row.guest_schedule),
            updated_at: row.updated_at,
        }
    }
}

impl Entity for Room {
    type Key = String;

    fn key(&self) -> &String {
        &self.room_number
    }

    fn revision(&self) -> Option<DateTime<Utc>> {
        record::parse_timestamp(self.updated_at.as_deref())
    }
}

impl Record for Room {
    const KIND: EntityKind = EntityKind::Rooms;
    const IDENTITY: &'static str = "room_number";

    fn from_row(row: Value) -> Result<Self> {
        let row: RoomRow = record::decode::<Self, _>(row)?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;
    use serde_json::json;

    #[test]
    fn room_is_keyed_by_number() {
        let room = Room::from_row(json!({
            "room_number": "1205",
            "status": "occupied",
            "guest_name": "Sarah Chen",
            "temperature": 21.5,
            "lights": true,
            "housekeeping_status": "in progress",
            "guest_schedule": [{"time": "19:00", "activity": "Dinner", "notes": "Table for two"}]
        }))
        .unwrap();

        assert_eq!(room.key(), "1205");
        assert_eq!(room.status, RoomStatus::Occupied);
        assert_eq!(room.temperature, 21.5);
        assert!(room.lights);
        assert_eq!(room.housekeeping_status, HousekeepingStatus::InProgress);
        assert_eq!(room.guest_schedule.len(), 1);
    }

    #[test]
    fn sparse_room_gets_defaults() {
        let room = Room::from_row(json!({"room_number": "101", "id": 7})).unwrap();
        assert_eq!(room.status, RoomStatus::Vacant);
        assert_eq!(room.temperature, 22.0);
        assert!(!room.do_not_disturb && !room.ac_on && !room.curtains_open);
        assert_eq!(room.housekeeping_status, HousekeepingStatus::Pending);
        assert!(room.guest_schedule.is_empty());
        assert!(room.revision().is_none());
    }

    #[test]
    fn row_id_is_not_the_identity() {
        let err = Room::from_row(json!({"id": "8c1f", "status": "vacant"})).unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingIdentity {
                kind: EntityKind::Rooms,
                field: "room_number"
            }
        ));
    }

    #[test]
    fn housekeeping_serializes_with_a_space() {
        let room = Room::from_row(json!({
            "room_number": "303",
            "housekeeping_status": "in_progress"
        }))
        .unwrap();
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["housekeepingStatus"], "in progress");
        assert_eq!(json["roomNumber"], "303");
    }
}
