//! Entities tracked by a live collection, and the change events that carry them.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::error::{Result, SyncError};

/// A domain record held in a live collection.
///
/// The synchronizer treats everything but the identity key as opaque payload.
/// Equality is used only to recognise a redelivered event as a no-op.
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    /// Identity key, unique within one collection.
    type Key: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Returns the identity key of this entity.
    fn key(&self) -> &Self::Key;

    /// Returns when this state of the entity was produced, if known.
    ///
    /// Only consulted when stale-event rejection is enabled.
    fn revision(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// The full current state of one entity, pushed by the change stream.
///
/// There are no partial updates and no deletions: every event is a whole-entity upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<E: Entity> {
    key: E::Key,
    entity: E,
}

impl<E: Entity> ChangeEvent<E> {
    /// Creates an upsert event tagged with the entity's own key.
    pub fn upsert(entity: E) -> Self {
        Self {
            key: entity.key().clone(),
            entity,
        }
    }

    /// Creates an event with an explicit tag, rejecting a tag that disagrees with the entity.
    pub fn new(key: E::Key, entity: E) -> Result<Self> {
        if &key != entity.key() {
            return Err(SyncError::KeyMismatch {
                tagged: key.to_string(),
                actual: entity.key().to_string(),
            });
        }
        Ok(Self { key, entity })
    }

    /// Returns the identity this event is tagged with.
    pub fn key(&self) -> &E::Key {
        &self.key
    }

    /// Returns the carried entity state.
    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Consumes the event, returning the entity state.
    pub fn into_entity(self) -> E {
        self.entity
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal entity used by the crate's unit tests.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Item {
        pub id: String,
        pub status: String,
        pub updated_at: Option<DateTime<Utc>>,
    }

    impl Item {
        pub fn new(id: &str, status: &str) -> Self {
            Self {
                id: id.to_string(),
                status: status.to_string(),
                updated_at: None,
            }
        }

        pub fn at(mut self, updated_at: DateTime<Utc>) -> Self {
            self.updated_at = Some(updated_at);
            self
        }
    }

    impl Entity for Item {
        type Key = String;

        fn key(&self) -> &String {
            &self.id
        }

        fn revision(&self) -> Option<DateTime<Utc>> {
            self.updated_at
        }
    }
}
