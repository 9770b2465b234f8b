//! Domain error types.

use common::{EntityKind, UnknownEntityKind};
use thiserror::Error;

/// Errors that can occur while decoding dashboard records.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The row carries no usable identity.
    #[error("{kind} row has no string `{field}`")]
    MissingIdentity {
        kind: EntityKind,
        field: &'static str,
    },

    /// A change payload was routed to the wrong collection.
    #[error("Payload for table {actual} cannot be decoded as {expected}")]
    WrongTable { expected: EntityKind, actual: String },

    /// The payload names a table the dashboard does not track.
    #[error(transparent)]
    UnknownTable(#[from] UnknownEntityKind),

    /// A field had an unexpected shape.
    #[error("Row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
