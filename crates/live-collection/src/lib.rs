//! Live collections: in-memory snapshots kept current by change notifications.
//!
//! This crate provides the synchronization core shared by every dashboard collection:
//! - [`Entity`] trait for identity extraction, and [`ChangeEvent`] whole-entity upserts
//! - [`SnapshotStore`] and its read-only [`Snapshot`] views
//! - [`Loader`] and [`SubscriptionTransport`] seams for the one-shot fetch and the change stream
//! - [`Synchronizer`] binding both to a store under an activate/deactivate lifecycle
//! - [`InMemoryTransport`] for process-local change feeds

pub mod entity;
pub mod error;
pub mod guard;
pub mod loader;
pub mod memory;
pub mod store;
pub mod synchronizer;
pub mod transport;

pub use common::Generation;
pub use entity::{ChangeEvent, Entity};
pub use error::{LoadError, Result, SubscribeError, SyncError};
pub use guard::ConfigGuard;
pub use loader::{FnLoader, Loader};
pub use memory::InMemoryTransport;
pub use store::{MergeOptions, MergeOutcome, MergePolicy, Snapshot, SnapshotStore};
pub use synchronizer::{Activation, SyncStatus, SyncView, Synchronizer, SynchronizerBuilder};
pub use transport::{Subscription, SubscriptionTransport};
