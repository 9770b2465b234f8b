//! Ordered, identity-unique snapshot store.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use crate::entity::{ChangeEvent, Entity};

/// A read-only view of a collection at one point in time.
///
/// Cloning is cheap. A snapshot handed out is never mutated afterwards:
/// the store copies on write when a reader still holds the previous one.
#[derive(Debug)]
pub struct Snapshot<E> {
    items: Arc<Vec<E>>,
}

impl<E> Clone for Snapshot<E> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<E> Default for Snapshot<E> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<E> Deref for Snapshot<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.items
    }
}

impl<E: PartialEq> PartialEq for Snapshot<E> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<E: Entity> Snapshot<E> {
    /// Finds the entity with the given identity.
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.items.iter().find(|e| e.key() == key)
    }

    /// Returns the position of the entity with the given identity.
    pub fn position(&self, key: &E::Key) -> Option<usize> {
        self.items.iter().position(|e| e.key() == key)
    }

    /// Returns the identity keys in order.
    pub fn keys(&self) -> Vec<E::Key> {
        self.items.iter().map(|e| e.key().clone()).collect()
    }

    /// Copies the entities out of the snapshot.
    pub fn to_vec(&self) -> Vec<E> {
        self.items.as_ref().clone()
    }

    /// Returns true when both snapshots share the same underlying storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

/// How an update to an already-present identity is positioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Replace the entry where it stands.
    #[default]
    InPlace,
    /// Remove the entry and place the new state at the head, like a feed.
    MoveToFront,
}

/// Options applied to every merge of a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub policy: MergePolicy,
    /// Ignore an event whose revision is older than the stored entity's.
    pub reject_stale: bool,
}

impl MergeOptions {
    /// Options with the given policy and stale rejection off.
    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            policy,
            reject_stale: false,
        }
    }

    /// Enables or disables stale-event rejection.
    pub fn reject_stale(mut self, reject: bool) -> Self {
        self.reject_stale = reject;
        self
    }
}

/// What a single merge did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new identity was placed at the head.
    Inserted,
    /// An existing entry was replaced at its position.
    Replaced { position: usize },
    /// An existing entry was moved from `from` to the head.
    Moved { from: usize },
    /// The event carried exactly the stored state.
    Unchanged,
    /// The event was older than the stored state and was ignored.
    Stale,
}

impl MergeOutcome {
    /// Returns true if the store's contents changed.
    pub fn changed(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged | MergeOutcome::Stale)
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            MergeOutcome::Inserted => "inserted",
            MergeOutcome::Replaced { .. } => "replaced",
            MergeOutcome::Moved { .. } => "moved",
            MergeOutcome::Unchanged => "unchanged",
            MergeOutcome::Stale => "stale",
        }
    }
}

/// The in-memory, ordered, identity-unique collection behind a binding.
///
/// Holds at most one entry per identity. New identities go to the head.
#[derive(Debug)]
pub struct SnapshotStore<E> {
    items: Arc<Vec<E>>,
}

impl<E> Default for SnapshotStore<E> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<E: Entity> SnapshotStore<E> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current contents.
    pub fn snapshot(&self) -> Snapshot<E> {
        Snapshot {
            items: Arc::clone(&self.items),
        }
    }

    /// Returns the number of entities held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replaces the entire contents with a loader result.
    ///
    /// The loader's order is kept. If an identity appears more than once,
    /// its first occurrence wins.
    pub fn initialize(&mut self, entities: Vec<E>) -> Snapshot<E> {
        let total = entities.len();
        let mut seen = HashSet::with_capacity(total);
        let items: Vec<E> = entities
            .into_iter()
            .filter(|e| seen.insert(e.key().clone()))
            .collect();

        if items.len() < total {
            tracing::warn!(
                dropped = total - items.len(),
                "loader returned duplicate identities"
            );
        }

        self.items = Arc::new(items);
        self.snapshot()
    }

    /// Upserts an entity in place (or at the head if new) and returns the new contents.
    pub fn upsert(&mut self, entity: E) -> Snapshot<E> {
        self.upsert_with(entity, MergePolicy::InPlace)
    }

    /// Upserts an entity under the given policy and returns the new contents.
    pub fn upsert_with(&mut self, entity: E, policy: MergePolicy) -> Snapshot<E> {
        self.apply(ChangeEvent::upsert(entity), &MergeOptions::with_policy(policy));
        self.snapshot()
    }

    /// Merges one change event and reports what happened.
    pub fn apply(&mut self, event: ChangeEvent<E>, options: &MergeOptions) -> MergeOutcome {
        let entity = event.into_entity();

        let Some(index) = self.items.iter().position(|e| e.key() == entity.key()) else {
            Arc::make_mut(&mut self.items).insert(0, entity);
            return MergeOutcome::Inserted;
        };

        let current = &self.items[index];
        if options.reject_stale && is_older(&entity, current) {
            return MergeOutcome::Stale;
        }
        let same_state = *current == entity;

        match options.policy {
            MergePolicy::InPlace => {
                if same_state {
                    return MergeOutcome::Unchanged;
                }
                Arc::make_mut(&mut self.items)[index] = entity;
                MergeOutcome::Replaced { position: index }
            }
            MergePolicy::MoveToFront => {
                if index == 0 {
                    if same_state {
                        return MergeOutcome::Unchanged;
                    }
                    Arc::make_mut(&mut self.items)[0] = entity;
                    return MergeOutcome::Replaced { position: 0 };
                }
                let items = Arc::make_mut(&mut self.items);
                items.remove(index);
                items.insert(0, entity);
                MergeOutcome::Moved { from: index }
            }
        }
    }
}

fn is_older<E: Entity>(incoming: &E, stored: &E) -> bool {
    matches!(
        (incoming.revision(), stored.revision()),
        (Some(incoming), Some(stored)) if incoming < stored
    )
}
