//! Subscription transports that push change events.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::entity::{ChangeEvent, Entity};
use crate::error::SubscribeError;

/// Producer side of a live change stream.
///
/// `start` hands the transport the sending half of a channel; the transport
/// pushes every change it observes from (at least) the moment `start` is
/// invoked until the returned [`Subscription`] is stopped.
#[async_trait]
pub trait SubscriptionTransport<E: Entity>: Send + Sync {
    /// Opens a stream delivering change events into `sink`.
    async fn start(
        &self,
        sink: mpsc::UnboundedSender<ChangeEvent<E>>,
    ) -> Result<Subscription, SubscribeError>;
}

/// Handle to a running change stream.
///
/// Stopping is idempotent; dropping the handle stops the stream.
pub struct Subscription {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a handle that runs `stop` the first time it is stopped.
    pub fn new<F>(stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// A handle with nothing to stop.
    pub fn noop() -> Self {
        Self { stop: None }
    }

    /// Stops the stream. Further calls do nothing.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }

    /// Returns true until the stream has been stopped.
    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
