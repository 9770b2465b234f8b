pub mod collections;
pub mod health;
pub mod metrics;
pub mod realtime;

use std::sync::Arc;

use crate::collections::Collections;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub collections: Arc<Collections>,
}
