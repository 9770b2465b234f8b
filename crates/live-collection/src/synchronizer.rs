//! Synchronizer binding a loader and a change stream to a snapshot store.

use std::sync::Arc;

use common::Generation;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::entity::{ChangeEvent, Entity};
use crate::error::{Result, SubscribeError, SyncError};
use crate::guard::ConfigGuard;
use crate::loader::Loader;
use crate::store::{MergeOptions, MergeOutcome, MergePolicy, Snapshot, SnapshotStore};
use crate::transport::{Subscription, SubscriptionTransport};

/// Lifecycle state of a binding as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Not activated, or deactivated.
    Idle,
    /// Waiting for the loader.
    Loading,
    /// Loader data published; `live` when change events are being merged.
    Ready { live: bool },
    /// The last load failed.
    Failed(String),
}

impl SyncStatus {
    /// Short label used by the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Loading => "loading",
            SyncStatus::Ready { .. } => "ready",
            SyncStatus::Failed(_) => "failed",
        }
    }
}

/// What readers observe: the current snapshot and the binding's state.
#[derive(Debug, Clone)]
pub struct SyncView<E> {
    pub snapshot: Snapshot<E>,
    pub status: SyncStatus,
    pub generation: Generation,
}

/// Result of a successful `activate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Loader data published and change events are being merged.
    Live,
    /// Loader data published; the configuration guard refused live updates.
    LoaderOnly,
    /// Loader data published; the transport could not start a stream.
    Degraded(SubscribeError),
    /// A later `activate` or `deactivate` superseded this call; nothing was written.
    Superseded,
}

impl Activation {
    /// Short label used in logs and HTTP responses.
    pub fn label(&self) -> &'static str {
        match self {
            Activation::Live => "live",
            Activation::LoaderOnly => "loader_only",
            Activation::Degraded(_) => "degraded",
            Activation::Superseded => "superseded",
        }
    }
}

struct Binding {
    subscription: Subscription,
    consumer: JoinHandle<()>,
}

impl Binding {
    fn stop(mut self) {
        self.subscription.stop();
        self.consumer.abort();
    }
}

struct State<E: Entity> {
    store: SnapshotStore<E>,
    generation: Generation,
    status: SyncStatus,
    binding: Option<Binding>,
}

struct Shared<E: Entity> {
    name: String,
    state: Mutex<State<E>>,
    view: watch::Sender<SyncView<E>>,
}

impl<E: Entity> Shared<E> {
    fn publish(&self, state: &State<E>) {
        metrics::gauge!("live_collection_size", "collection" => self.name.clone())
            .set(state.store.len() as f64);
        self.view.send_replace(SyncView {
            snapshot: state.store.snapshot(),
            status: state.status.clone(),
            generation: state.generation,
        });
    }

    fn discard_stale(&self, captured: Generation, current: Generation) -> Activation {
        metrics::counter!("live_collection_stale_completions_total", "collection" => self.name.clone())
            .increment(1);
        tracing::debug!(%captured, %current, "discarding superseded completion");
        Activation::Superseded
    }
}

/// Keeps one live collection current.
///
/// On [`activate`](Self::activate) the loader's result replaces the store,
/// then, if the configuration guard passes, a subscription is started and
/// every delivered change event is merged in delivery order by a consumer
/// task. [`deactivate`](Self::deactivate) stops the subscription, cancels the
/// consumer and discards the store. At most one subscription is active per
/// synchronizer; completions captured under an older generation are dropped.
pub struct Synchronizer<E: Entity> {
    loader: Arc<dyn Loader<E>>,
    transport: Arc<dyn SubscriptionTransport<E>>,
    guard: ConfigGuard,
    options: MergeOptions,
    shared: Arc<Shared<E>>,
}

impl<E: Entity> Synchronizer<E> {
    /// Starts building a synchronizer for the named collection.
    pub fn builder(name: impl Into<String>) -> SynchronizerBuilder<E> {
        SynchronizerBuilder::new(name)
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the merge options applied to change events.
    pub fn options(&self) -> MergeOptions {
        self.options
    }

    /// Loads the collection and, if configured, starts merging change events.
    ///
    /// Any previous binding is deactivated and its data discarded first, so
    /// readers see an empty store while loading. A loader failure is returned
    /// and leaves no subscription running; a subscription failure is reported
    /// as [`Activation::Degraded`] while the loaded data stays published.
    #[tracing::instrument(skip(self), fields(collection = %self.shared.name))]
    pub async fn activate(&self) -> Result<Activation> {
        let (generation, previous) = {
            let mut state = self.shared.state.lock();
            let previous = state.binding.take();
            state.generation = state.generation.next();
            state.store = SnapshotStore::new();
            state.status = SyncStatus::Loading;
            self.shared.publish(&state);
            (state.generation, previous)
        };
        if let Some(previous) = previous {
            previous.stop();
        }

        metrics::counter!("live_collection_activations_total", "collection" => self.shared.name.clone())
            .increment(1);

        let loaded = self.loader.load().await;

        {
            let mut state = self.shared.state.lock();
            if state.generation != generation {
                return Ok(self.shared.discard_stale(generation, state.generation));
            }
            match loaded {
                Ok(entities) => {
                    state.store.initialize(entities);
                    state.status = SyncStatus::Ready { live: false };
                    self.shared.publish(&state);
                }
                Err(err) => {
                    state.status = SyncStatus::Failed(err.to_string());
                    self.shared.publish(&state);
                    metrics::counter!("live_collection_load_failures_total", "collection" => self.shared.name.clone())
                        .increment(1);
                    tracing::warn!(loader = self.loader.name(), error = %err, "initial load failed");
                    return Err(SyncError::Load(err));
                }
            }
        }

        if !self.guard.is_configured() {
            tracing::info!(%generation, "backend not configured, serving loader data only");
            return Ok(Activation::LoaderOnly);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = match self.transport.start(tx).await {
            Ok(subscription) => subscription,
            Err(err) => {
                let current = self.shared.state.lock().generation;
                if current != generation {
                    return Ok(self.shared.discard_stale(generation, current));
                }
                tracing::warn!(error = %err, "live updates unavailable, serving loader data only");
                return Ok(Activation::Degraded(err));
            }
        };

        let leftover = {
            let mut state = self.shared.state.lock();
            if state.generation != generation {
                Some((subscription, state.generation))
            } else {
                let consumer = tokio::spawn(consume(
                    rx,
                    Arc::clone(&self.shared),
                    generation,
                    self.options,
                ));
                state.binding = Some(Binding {
                    subscription,
                    consumer,
                });
                state.status = SyncStatus::Ready { live: true };
                self.shared.publish(&state);
                None
            }
        };

        match leftover {
            Some((mut subscription, current)) => {
                subscription.stop();
                Ok(self.shared.discard_stale(generation, current))
            }
            None => {
                tracing::info!(%generation, "live updates started");
                Ok(Activation::Live)
            }
        }
    }

    /// Stops live updates and discards the store.
    ///
    /// Safe to call at any time, any number of times.
    #[tracing::instrument(skip(self), fields(collection = %self.shared.name))]
    pub fn deactivate(&self) {
        let binding = {
            let mut state = self.shared.state.lock();
            state.generation = state.generation.next();
            state.store = SnapshotStore::new();
            state.status = SyncStatus::Idle;
            self.shared.publish(&state);
            state.binding.take()
        };

        if let Some(binding) = binding {
            binding.stop();
            tracing::info!("live updates stopped");
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot<E> {
        self.shared.state.lock().store.snapshot()
    }

    /// Returns the current status.
    pub fn status(&self) -> SyncStatus {
        self.shared.state.lock().status.clone()
    }

    /// Returns the current binding generation.
    pub fn generation(&self) -> Generation {
        self.shared.state.lock().generation
    }

    /// Returns true while a subscription is feeding the store.
    pub fn is_live(&self) -> bool {
        self.shared.state.lock().binding.is_some()
    }

    /// Returns a receiver that observes every published view.
    pub fn watch(&self) -> watch::Receiver<SyncView<E>> {
        self.shared.view.subscribe()
    }
}

impl<E: Entity> Drop for Synchronizer<E> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn consume<E: Entity>(
    mut rx: mpsc::UnboundedReceiver<ChangeEvent<E>>,
    shared: Arc<Shared<E>>,
    generation: Generation,
    options: MergeOptions,
) {
    while let Some(event) = rx.recv().await {
        let mut state = shared.state.lock();
        if state.generation != generation {
            return;
        }

        let key = event.key().clone();
        let outcome = state.store.apply(event, &options);
        metrics::counter!(
            "live_collection_events_applied_total",
            "collection" => shared.name.clone(),
            "outcome" => outcome.label()
        )
        .increment(1);

        if outcome.changed() {
            shared.publish(&state);
        }
        if outcome == MergeOutcome::Stale {
            tracing::warn!(collection = %shared.name, %key, "ignored change event older than stored state");
        } else {
            tracing::debug!(collection = %shared.name, %key, outcome = outcome.label(), "merged change event");
        }
    }

    // The transport dropped its sender: keep the data, stop claiming to be live.
    let mut state = shared.state.lock();
    if state.generation != generation {
        return;
    }
    if let Some(mut binding) = state.binding.take() {
        binding.subscription.stop();
    }
    state.status = SyncStatus::Ready { live: false };
    shared.publish(&state);
    tracing::warn!(collection = %shared.name, %generation, "change stream closed, live updates stopped");
}

/// Builder for [`Synchronizer`].
pub struct SynchronizerBuilder<E: Entity> {
    name: String,
    loader: Option<Arc<dyn Loader<E>>>,
    transport: Option<Arc<dyn SubscriptionTransport<E>>>,
    guard: ConfigGuard,
    options: MergeOptions,
}

impl<E: Entity> SynchronizerBuilder<E> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loader: None,
            transport: None,
            guard: ConfigGuard::default(),
            options: MergeOptions::default(),
        }
    }

    /// Sets the one-shot loader.
    pub fn loader(self, loader: impl Loader<E> + 'static) -> Self {
        self.shared_loader(Arc::new(loader))
    }

    /// Sets a loader shared with other owners.
    pub fn shared_loader(mut self, loader: Arc<dyn Loader<E>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the change-event transport.
    pub fn transport(self, transport: impl SubscriptionTransport<E> + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Sets a transport shared with other owners.
    pub fn shared_transport(mut self, transport: Arc<dyn SubscriptionTransport<E>>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the configuration guard. Defaults to always configured.
    pub fn guard(mut self, guard: ConfigGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Sets all merge options.
    pub fn options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the merge policy.
    pub fn policy(mut self, policy: MergePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Enables or disables stale-event rejection.
    pub fn reject_stale(mut self, reject: bool) -> Self {
        self.options.reject_stale = reject;
        self
    }

    /// Builds the synchronizer. Fails if the loader or transport is missing.
    pub fn build(self) -> Result<Synchronizer<E>> {
        let loader = self
            .loader
            .ok_or_else(|| SyncError::Misconfigured(format!("{}: no loader", self.name)))?;
        let transport = self
            .transport
            .ok_or_else(|| SyncError::Misconfigured(format!("{}: no transport", self.name)))?;

        let (view, _) = watch::channel(SyncView {
            snapshot: Snapshot::default(),
            status: SyncStatus::Idle,
            generation: Generation::initial(),
        });

        Ok(Synchronizer {
            loader,
            transport,
            guard: self.guard,
            options: self.options,
            shared: Arc::new(Shared {
                name: self.name,
                state: Mutex::new(State {
                    store: SnapshotStore::new(),
                    generation: Generation::initial(),
                    status: SyncStatus::Idle,
                    binding: None,
                }),
                view,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::Item;
    use crate::error::LoadError;
    use crate::loader::FnLoader;
    use crate::memory::InMemoryTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Accepts a subscription and immediately hangs up.
    struct ClosingTransport;

    #[async_trait]
    impl SubscriptionTransport<Item> for ClosingTransport {
        async fn start(
            &self,
            sink: mpsc::UnboundedSender<ChangeEvent<Item>>,
        ) -> std::result::Result<Subscription, SubscribeError> {
            drop(sink);
            Ok(Subscription::noop())
        }
    }

    fn fixture() -> Vec<Item> {
        vec![Item::new("req-001", "pending"), Item::new("req-002", "in-progress")]
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[test]
    fn build_requires_loader_and_transport() {
        let err = Synchronizer::<Item>::builder("items")
            .transport(InMemoryTransport::new())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::Misconfigured(_)));

        let err = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", vec![]))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn activate_publishes_loader_result_and_goes_live() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport.clone())
            .build()
            .unwrap();

        assert_eq!(sync.activate().await.unwrap(), Activation::Live);
        assert_eq!(sync.snapshot().keys(), vec!["req-001", "req-002"]);
        assert_eq!(sync.status(), SyncStatus::Ready { live: true });
        assert!(sync.is_live());
        assert_eq!(transport.subscriber_count(), 1);

        transport.publish(Item::new("req-003", "pending"));
        settle().await;
        assert_eq!(sync.snapshot().keys(), vec!["req-003", "req-001", "req-002"]);
    }

    #[tokio::test]
    async fn watchers_observe_merges() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport.clone())
            .build()
            .unwrap();
        let mut rx = sync.watch();

        sync.activate().await.unwrap();
        rx.borrow_and_update();

        transport.publish(Item::new("req-001", "done"));
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();

        let view = rx.borrow().clone();
        assert_eq!(view.snapshot[0].status, "done");
        assert_eq!(view.status, SyncStatus::Ready { live: true });
    }

    #[tokio::test]
    async fn load_failure_is_surfaced_without_subscribing() {
        let transport = InMemoryTransport::<Item>::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::new("items", || async {
                Err(LoadError::Transport("503".to_string()))
            }))
            .transport(transport.clone())
            .build()
            .unwrap();

        let err = sync.activate().await.unwrap_err();
        assert_eq!(err, SyncError::Load(LoadError::Transport("503".to_string())));
        assert!(matches!(sync.status(), SyncStatus::Failed(_)));
        assert!(sync.snapshot().is_empty());
        assert_eq!(transport.start_count(), 0);
    }

    #[tokio::test]
    async fn failed_reload_drops_the_previous_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = InMemoryTransport::<Item>::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::new("items", {
                let calls = Arc::clone(&calls);
                move || {
                    let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
                    async move {
                        if first {
                            Ok(vec![Item::new("req-001", "pending")])
                        } else {
                            Err(LoadError::Timeout)
                        }
                    }
                }
            }))
            .transport(transport.clone())
            .build()
            .unwrap();
        let rx = sync.watch();

        sync.activate().await.unwrap();
        assert_eq!(sync.snapshot().len(), 1);

        let err = sync.activate().await.unwrap_err();
        assert_eq!(err, SyncError::Load(LoadError::Timeout));
        assert!(matches!(sync.status(), SyncStatus::Failed(_)));
        assert!(sync.snapshot().is_empty());
        assert!(rx.borrow().snapshot.is_empty());
        assert!(!sync.is_live());
        assert_eq!(transport.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn closed_stream_is_no_longer_live() {
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(ClosingTransport)
            .build()
            .unwrap();

        assert_eq!(sync.activate().await.unwrap(), Activation::Live);
        settle().await;

        assert_eq!(sync.status(), SyncStatus::Ready { live: false });
        assert!(!sync.is_live());
        assert_eq!(sync.snapshot().keys(), vec!["req-001", "req-002"]);
    }

    #[tokio::test]
    async fn subscription_failure_keeps_loader_data() {
        let transport =
            InMemoryTransport::<Item>::failing(SubscribeError::Unavailable("offline".into()));
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport)
            .build()
            .unwrap();

        let outcome = sync.activate().await.unwrap();
        assert_eq!(
            outcome,
            Activation::Degraded(SubscribeError::Unavailable("offline".into()))
        );
        assert_eq!(sync.snapshot().len(), 2);
        assert_eq!(sync.status(), SyncStatus::Ready { live: false });
        assert!(!sync.is_live());
    }

    #[tokio::test]
    async fn reactivation_replaces_the_previous_subscription() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport.clone())
            .build()
            .unwrap();

        sync.activate().await.unwrap();
        transport.publish(Item::new("req-009", "pending"));
        settle().await;
        assert_eq!(sync.snapshot().len(), 3);

        sync.activate().await.unwrap();
        assert_eq!(transport.subscriber_count(), 1);
        assert_eq!(transport.start_count(), 2);
        // Fresh initialize drops the merged event.
        assert_eq!(sync.snapshot().keys(), vec!["req-001", "req-002"]);
    }

    #[tokio::test]
    async fn deactivate_discards_the_store() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport.clone())
            .build()
            .unwrap();

        sync.activate().await.unwrap();
        let before = sync.generation();
        sync.deactivate();

        assert!(sync.snapshot().is_empty());
        assert_eq!(sync.status(), SyncStatus::Idle);
        assert_eq!(transport.subscriber_count(), 0);
        assert!(sync.generation() > before);
    }

    #[tokio::test]
    async fn move_to_front_policy_is_applied_by_the_consumer() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("notifications")
            .loader(FnLoader::fixed("notifications", fixture()))
            .transport(transport.clone())
            .policy(MergePolicy::MoveToFront)
            .build()
            .unwrap();

        sync.activate().await.unwrap();
        transport.publish(Item::new("req-002", "read"));
        settle().await;

        assert_eq!(sync.snapshot().keys(), vec!["req-002", "req-001"]);
    }

    #[tokio::test]
    async fn dropping_the_synchronizer_stops_the_subscription() {
        let transport = InMemoryTransport::new();
        let sync = Synchronizer::<Item>::builder("items")
            .loader(FnLoader::fixed("items", fixture()))
            .transport(transport.clone())
            .build()
            .unwrap();

        sync.activate().await.unwrap();
        assert_eq!(transport.subscriber_count(), 1);
        drop(sync);
        assert_eq!(transport.subscriber_count(), 0);
    }
}
