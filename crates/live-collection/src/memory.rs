use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::entity::{ChangeEvent, Entity};
use crate::error::SubscribeError;
use crate::transport::{Subscription, SubscriptionTransport};

/// In-process change feed.
///
/// Every started subscription receives every event published after it
/// started, in publish order. Used by tests and by the dashboard's change
/// ingestion endpoint.
pub struct InMemoryTransport<E: Entity> {
    inner: Arc<Inner<E>>,
}

struct Inner<E: Entity> {
    subscribers: Mutex<Vec<(u64, mpsc::UnboundedSender<ChangeEvent<E>>)>>,
    failure: Mutex<Option<SubscribeError>>,
    next_id: AtomicU64,
    starts: AtomicUsize,
}

impl<E: Entity> Clone for InMemoryTransport<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Default for InMemoryTransport<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Vec::new()),
                failure: Mutex::new(None),
                next_id: AtomicU64::new(0),
                starts: AtomicUsize::new(0),
            }),
        }
    }
}

impl<E: Entity> InMemoryTransport<E> {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feed whose `start` always fails with `error`.
    pub fn failing(error: SubscribeError) -> Self {
        let transport = Self::new();
        transport.set_failure(Some(error));
        transport
    }

    /// Makes subsequent `start` calls fail, or succeed again with `None`.
    pub fn set_failure(&self, error: Option<SubscribeError>) {
        *self.inner.failure.lock() = error;
    }

    /// Publishes a whole-entity upsert. Returns how many subscribers received it.
    pub fn publish(&self, entity: E) -> usize {
        self.publish_event(ChangeEvent::upsert(entity))
    }

    /// Publishes a change event. Returns how many subscribers received it.
    pub fn publish_event(&self, event: ChangeEvent<E>) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Number of subscriptions currently running.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Number of times `start` has been called, successful or not.
    pub fn start_count(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Entity> SubscriptionTransport<E> for InMemoryTransport<E> {
    async fn start(
        &self,
        sink: mpsc::UnboundedSender<ChangeEvent<E>>,
    ) -> Result<Subscription, SubscribeError> {
        self.inner.starts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.inner.failure.lock().clone() {
            return Err(error);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.lock().push((id, sink));

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(move || {
            inner.subscribers.lock().retain(|(sid, _)| *sid != id);
        }))
    }
}
