//! Shared value types used across the live-collection crates.

pub mod types;

pub use types::{EntityKind, Generation, UnknownEntityKind};
