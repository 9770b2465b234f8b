//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::EntityKind;
use live_collection::{ConfigGuard, MergeOptions, MergePolicy};

/// Connection settings for the hosted database backend.
///
/// Both values must be present for live subscriptions to start; otherwise the
/// dashboard serves bundled fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
        }
    }

    /// Both URL and key are present and non-blank.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.anon_key)
    }

    pub fn guard(&self) -> ConfigGuard {
        ConfigGuard::from_value(self.is_configured())
    }

    /// Returns `(url, anon_key)` when configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.is_configured() {
            return None;
        }
        Some((
            self.url.as_deref()?.trim_end_matches('/'),
            self.anon_key.as_deref()?,
        ))
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for structured log lines (default: human-readable)
/// - `SUPABASE_URL` / `NEXT_PUBLIC_SUPABASE_URL`: backend URL
/// - `SUPABASE_ANON_KEY` / `NEXT_PUBLIC_SUPABASE_ANON_KEY`: backend key
/// - `REJECT_STALE_EVENTS`: drop change events older than the stored entity (default: `false`)
/// - `BACKEND_TIMEOUT_SECS`: initial load timeout (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub backend: BackendConfig,
    pub reject_stale: bool,
    pub backend_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let either = |primary: &str, fallback: &str| lookup(primary).or_else(|| lookup(fallback));
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
            backend: BackendConfig {
                url: either("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"),
                anon_key: either("SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"),
            },
            reject_stale: lookup("REJECT_STALE_EVENTS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.reject_stale),
            backend_timeout: lookup("BACKEND_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Merge options for a collection. The notification feed surfaces the
    /// most recently touched item first; every other board keeps positions.
    pub fn merge_options(&self, kind: EntityKind) -> MergeOptions {
        let policy = match kind {
            EntityKind::Notifications => MergePolicy::MoveToFront,
            _ => MergePolicy::InPlace,
        };
        MergeOptions::with_policy(policy).reject_stale(self.reject_stale)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            backend: BackendConfig::default(),
            reject_stale: false,
            backend_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(!config.backend.is_configured());
        assert!(!config.reject_stale);
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_backend_needs_both_values() {
        let config = Config::from_lookup(lookup(&[("SUPABASE_URL", "https://db.example.com")]));
        assert!(!config.backend.is_configured());
        assert!(!config.backend.guard().is_configured());

        let blank_key = BackendConfig::new("https://db.example.com", "   ");
        assert!(!blank_key.is_configured());
        assert!(blank_key.credentials().is_none());
    }

    #[test]
    fn test_public_prefixed_names_are_accepted() {
        let config = Config::from_lookup(lookup(&[
            ("NEXT_PUBLIC_SUPABASE_URL", "https://db.example.com/"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
            ("PORT", "8080"),
            ("REJECT_STALE_EVENTS", "true"),
            ("LOG_FORMAT", "JSON"),
        ]));

        assert!(config.backend.is_configured());
        assert_eq!(
            config.backend.credentials(),
            Some(("https://db.example.com", "anon"))
        );
        assert_eq!(config.port, 8080);
        assert!(config.reject_stale);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "http"), ("BACKEND_TIMEOUT_SECS", "-1")]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.backend_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_merge_options_per_kind() {
        let config = Config {
            reject_stale: true,
            ..Config::default()
        };
        let feed = config.merge_options(EntityKind::Notifications);
        assert_eq!(feed.policy, MergePolicy::MoveToFront);
        assert!(feed.reject_stale);
        assert_eq!(config.merge_options(EntityKind::Rooms).policy, MergePolicy::InPlace);
    }
}
