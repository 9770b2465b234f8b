//! One-shot loaders that produce the initial collection.

use std::future::Future;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::entity::Entity;
use crate::error::LoadError;

/// Fetches the full current collection.
///
/// Loaders are idempotent: a synchronizer calls `load` once per activation
/// and may call it again on the next activation.
#[async_trait]
pub trait Loader<E: Entity>: Send + Sync {
    /// Returns a name for this loader, used in logs.
    fn name(&self) -> &str;

    /// Returns the ordered collection, or the reason it could not be fetched.
    async fn load(&self) -> Result<Vec<E>, LoadError>;
}

/// A loader backed by a closure returning a future.
pub struct FnLoader<E> {
    name: String,
    load: Box<dyn Fn() -> BoxFuture<'static, Result<Vec<E>, LoadError>> + Send + Sync>,
}

impl<E: Entity> FnLoader<E> {
    /// Wraps a closure as a loader.
    pub fn new<F, Fut>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<E>, LoadError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            load: Box::new(move || Box::pin(load())),
        }
    }

    /// A loader that always returns the given entities.
    pub fn fixed(name: impl Into<String>, entities: Vec<E>) -> Self {
        Self::new(name, move || {
            let entities = entities.clone();
            async move { Ok(entities) }
        })
    }
}

#[async_trait]
impl<E: Entity> Loader<E> for FnLoader<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<E>, LoadError> {
        (self.load)().await
    }
}
