//! Configuration guard deciding whether live updates are attempted.

use std::fmt;
use std::sync::Arc;

/// Predicate answering whether the backend connection is configured.
///
/// Evaluated once per activation. When it answers `false` the binding
/// serves the loader result only and never subscribes.
#[derive(Clone)]
pub struct ConfigGuard {
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl ConfigGuard {
    /// A guard that always passes.
    pub fn configured() -> Self {
        Self::from_value(true)
    }

    /// A guard that never passes.
    pub fn unconfigured() -> Self {
        Self::from_value(false)
    }

    /// A guard with a fixed answer.
    pub fn from_value(configured: bool) -> Self {
        Self::from_predicate(move || configured)
    }

    /// A guard backed by an arbitrary side-effect-free predicate.
    pub fn from_predicate<F>(check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    /// Evaluates the guard.
    pub fn is_configured(&self) -> bool {
        (self.check)()
    }
}

impl Default for ConfigGuard {
    fn default() -> Self {
        Self::configured()
    }
}

impl fmt::Debug for ConfigGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigGuard")
            .field("configured", &self.is_configured())
            .finish()
    }
}
