//! The dashboard's live collections, one binding per entity kind.

use std::sync::Arc;

use async_trait::async_trait;
use common::EntityKind;
use domain::{
    DomainError, GuestProfile, GuestRequest, Notification, RealtimePayload, Record, Room,
    ServiceRequest,
};
use futures_util::future::join_all;
use live_collection::{
    Activation, ConfigGuard, InMemoryTransport, SyncError, SyncStatus, Synchronizer,
};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::fixtures::FixtureLoader;
use crate::rest::{RestClient, RestLoader};

/// Where initial loads come from.
#[derive(Debug, Clone)]
pub enum Source {
    Fixtures,
    Rest(RestClient),
}

impl Source {
    /// Uses the backend when it is configured, fixtures otherwise.
    pub fn from_config(config: &Config) -> Self {
        match config.backend.credentials() {
            Some((url, key)) => Source::Rest(RestClient::new(url, key, config.backend_timeout)),
            None => Source::Fixtures,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Source::Fixtures => "fixtures",
            Source::Rest(_) => "rest",
        }
    }
}

/// Point-in-time description of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub kind: EntityKind,
    pub table: &'static str,
    pub slug: &'static str,
    pub status: &'static str,
    pub live: bool,
    pub size: usize,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of routing one realtime payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ingested {
    /// The payload carried a row image and was published.
    pub accepted: bool,
    /// Live subscribers that received it.
    pub delivered: usize,
}

/// Type-erased view of a binding, so handlers can dispatch by kind.
#[async_trait]
pub trait LiveCollection: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn activate(&self) -> Result<Activation, SyncError>;

    fn deactivate(&self);

    fn summary(&self) -> CollectionSummary;

    /// The current snapshot as a JSON array, in display order.
    fn snapshot_json(&self) -> Result<Value, serde_json::Error>;

    /// Decodes a realtime payload and publishes it to the live subscription.
    fn ingest(&self, payload: RealtimePayload) -> Result<Ingested, DomainError>;
}

/// A synchronizer together with the change feed it subscribes to.
pub struct Binding<R: Record> {
    sync: Synchronizer<R>,
    feed: InMemoryTransport<R>,
}

impl<R: Record> Binding<R> {
    fn new(config: &Config, source: &Source, guard: ConfigGuard) -> Result<Self, SyncError> {
        let feed = InMemoryTransport::new();
        let builder = Synchronizer::<R>::builder(R::KIND.table())
            .transport(feed.clone())
            .guard(guard)
            .options(config.merge_options(R::KIND));
        let builder = match source {
            Source::Fixtures => builder.loader(FixtureLoader::<R>::new()),
            Source::Rest(client) => builder.loader(RestLoader::<R>::new(client.clone())),
        };

        Ok(Self {
            sync: builder.build()?,
            feed,
        })
    }
}

#[async_trait]
impl<R: Record> LiveCollection for Binding<R> {
    fn kind(&self) -> EntityKind {
        R::KIND
    }

    async fn activate(&self) -> Result<Activation, SyncError> {
        self.sync.activate().await
    }

    fn deactivate(&self) {
        self.sync.deactivate();
    }

    fn summary(&self) -> CollectionSummary {
        let view = self.sync.watch().borrow().clone();
        let error = match &view.status {
            SyncStatus::Failed(reason) => Some(reason.clone()),
            _ => None,
        };

        CollectionSummary {
            kind: R::KIND,
            table: R::KIND.table(),
            slug: R::KIND.slug(),
            status: view.status.label(),
            live: matches!(view.status, SyncStatus::Ready { live: true }),
            size: view.snapshot.len(),
            generation: view.generation.as_u64(),
            error,
        }
    }

    fn snapshot_json(&self) -> Result<Value, serde_json::Error> {
        let snapshot = self.sync.snapshot();
        serde_json::to_value(&*snapshot)
    }

    fn ingest(&self, payload: RealtimePayload) -> Result<Ingested, DomainError> {
        let Some(event) = payload.into_change::<R>()? else {
            return Ok(Ingested {
                accepted: false,
                delivered: 0,
            });
        };
        let delivered = self.feed.publish_event(event);
        Ok(Ingested {
            accepted: true,
            delivered,
        })
    }
}

/// Every live collection the dashboard serves.
pub struct Collections {
    bindings: Vec<Arc<dyn LiveCollection>>,
    source: &'static str,
}

impl Collections {
    /// Builds all bindings, loading from the backend when it is configured.
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        Self::build(config, Source::from_config(config), config.backend.guard())
    }

    /// Builds all bindings from an explicit source and guard.
    pub fn build(config: &Config, source: Source, guard: ConfigGuard) -> Result<Self, SyncError> {
        let bindings = EntityKind::ALL
            .into_iter()
            .map(|kind| bind(kind, config, &source, guard.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bindings,
            source: source.label(),
        })
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn get(&self, kind: EntityKind) -> Option<&dyn LiveCollection> {
        self.bindings
            .iter()
            .find(|b| b.kind() == kind)
            .map(Arc::as_ref)
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.bindings.iter().map(|b| b.summary()).collect()
    }

    /// Activates every collection concurrently. A failure of one kind does not
    /// stop the others.
    #[tracing::instrument(skip(self), fields(source = self.source))]
    pub async fn activate_all(&self) -> Vec<(EntityKind, Result<Activation, SyncError>)> {
        let outcomes = join_all(self.bindings.iter().map(|binding| async move {
            (binding.kind(), binding.activate().await)
        }))
        .await;

        for (kind, outcome) in &outcomes {
            match outcome {
                Ok(Activation::Degraded(err)) => {
                    tracing::warn!(%kind, error = %err, "collection loaded without live updates");
                }
                Ok(activation) => {
                    tracing::info!(%kind, outcome = activation.label(), "collection activated");
                }
                Err(err) => {
                    tracing::error!(%kind, error = %err, "collection failed to activate");
                }
            }
        }
        outcomes
    }

    pub fn deactivate_all(&self) {
        for binding in &self.bindings {
            binding.deactivate();
        }
        tracing::info!(collections = self.bindings.len(), "collections deactivated");
    }
}

fn bind(
    kind: EntityKind,
    config: &Config,
    source: &Source,
    guard: ConfigGuard,
) -> Result<Arc<dyn LiveCollection>, SyncError> {
    let binding: Arc<dyn LiveCollection> = match kind {
        EntityKind::GuestProfiles => Arc::new(Binding::<GuestProfile>::new(config, source, guard)?),
        EntityKind::GuestRequests => Arc::new(Binding::<GuestRequest>::new(config, source, guard)?),
        EntityKind::ServiceRequests => {
            Arc::new(Binding::<ServiceRequest>::new(config, source, guard)?)
        }
        EntityKind::Rooms => Arc::new(Binding::<Room>::new(config, source, guard)?),
        EntityKind::Notifications => Arc::new(Binding::<Notification>::new(config, source, guard)?),
    };
    Ok(binding)
}
