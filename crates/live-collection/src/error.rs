//! Synchronization error types.

use thiserror::Error;

/// Failure of the one-shot loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The fetch could not reach the backend or the backend rejected it.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered but the rows could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The fetch did not complete in time.
    #[error("Load timed out")]
    Timeout,
}

/// Failure to start a live change stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// The transport cannot open a stream right now.
    #[error("Subscription unavailable: {0}")]
    Unavailable(String),

    /// The transport has been shut down.
    #[error("Subscription transport closed")]
    Closed,
}

/// Errors that can occur while synchronizing a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The initial load failed; nothing was published.
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// The live stream could not be started.
    #[error("Subscribe failed: {0}")]
    Subscribe(#[from] SubscribeError),

    /// A change event was tagged with an identity other than its entity's.
    #[error("Change event key mismatch: tagged {tagged}, entity is {actual}")]
    KeyMismatch { tagged: String, actual: String },

    /// The synchronizer was built without a required collaborator.
    #[error("Synchronizer misconfigured: {0}")]
    Misconfigured(String),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_converts_and_displays() {
        let err: SyncError = LoadError::Transport("connection refused".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Load failed: Transport error: connection refused"
        );
    }

    #[test]
    fn subscribe_error_converts() {
        let err: SyncError = SubscribeError::Closed.into();
        assert!(matches!(err, SyncError::Subscribe(SubscribeError::Closed)));
    }
}
