//! Bundled sample rows served when no backend is configured.

use std::marker::PhantomData;

use async_trait::async_trait;
use common::EntityKind;
use domain::{Record, decode_rows};
use live_collection::{LoadError, Loader};
use serde_json::Value;

/// Returns the bundled JSON rows for `kind`.
pub fn rows_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::GuestProfiles => include_str!("../fixtures/guest_profiles.json"),
        EntityKind::GuestRequests => include_str!("../fixtures/guest_requests.json"),
        EntityKind::ServiceRequests => include_str!("../fixtures/service_requests.json"),
        EntityKind::Rooms => include_str!("../fixtures/rooms.json"),
        EntityKind::Notifications => include_str!("../fixtures/notifications.json"),
    }
}

/// Loads a collection from the bundled fixtures.
pub struct FixtureLoader<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> FixtureLoader<R> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R: Record> Default for FixtureLoader<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> Loader<R> for FixtureLoader<R> {
    fn name(&self) -> &str {
        "fixtures"
    }

    async fn load(&self) -> Result<Vec<R>, LoadError> {
        let rows: Vec<Value> = serde_json::from_str(rows_for(R::KIND))
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        decode_rows(rows).map_err(|e| LoadError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{GuestProfile, GuestRequest, Notification, Room, ServiceRequest};
    use live_collection::Entity;

    async fn keys<R: Record<Key = String>>() -> Vec<String> {
        FixtureLoader::<R>::new()
            .load()
            .await
            .unwrap()
            .iter()
            .map(|r| r.key().clone())
            .collect()
    }

    #[tokio::test]
    async fn every_fixture_decodes() {
        assert_eq!(keys::<GuestRequest>().await, vec!["req-001", "req-002"]);
        assert_eq!(keys::<Notification>().await, vec!["notif-001", "notif-002"]);
        assert_eq!(keys::<Room>().await, vec!["2104", "1802", "1205"]);
        assert_eq!(keys::<GuestProfile>().await, vec!["guest-001", "guest-002"]);
        assert_eq!(keys::<ServiceRequest>().await, vec!["sr-001", "sr-002"]);
    }

    #[tokio::test]
    async fn fixture_rows_get_row_defaults() {
        let profiles = FixtureLoader::<GuestProfile>::new().load().await.unwrap();
        assert_eq!(profiles[1].vip_status, "Standard");

        let requests = FixtureLoader::<ServiceRequest>::new().load().await.unwrap();
        assert_eq!(requests[0].guest_name.as_deref(), Some("James"));
        assert_eq!(
            requests[0].latest_update.as_ref().map(|u| u.id.as_str()),
            Some("sru-002")
        );
    }
}
