//! Initial loads from the backend's PostgREST endpoint.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use common::EntityKind;
use domain::{Record, decode_rows};
use live_collection::{LoadError, Loader};
use serde_json::Value;

const SERVICE_REQUEST_SELECT: &str =
    "*,profiles(id,display_name,username,first_name,last_name),service_request_updates(*)";

/// Columns to select and ordering for a collection's initial fetch.
pub fn query_for(kind: EntityKind) -> Vec<(&'static str, &'static str)> {
    match kind {
        EntityKind::GuestProfiles => vec![("select", "*"), ("order", "created_at.desc")],
        EntityKind::GuestRequests => {
            vec![("select", "*"), ("order", "timestamp.desc,created_at.desc")]
        }
        EntityKind::ServiceRequests => vec![
            ("select", SERVICE_REQUEST_SELECT),
            ("order", "created_at.desc"),
        ],
        EntityKind::Rooms => vec![("select", "*")],
        EntityKind::Notifications => vec![("select", "*"), ("order", "timestamp.desc")],
    }
}

/// Shared HTTP client for the backend's REST interface.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

impl RestClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            timeout,
        }
    }

    pub fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    /// Fetches every row of `kind`'s table.
    #[tracing::instrument(skip(self), fields(table = kind.table()))]
    pub async fn fetch_rows(&self, kind: EntityKind) -> Result<Vec<Value>, LoadError> {
        let request = self
            .http
            .get(self.table_url(kind))
            .query(&query_for(kind))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| LoadError::Timeout)?
            .map_err(|e| LoadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "backend rejected fetch");
            return Err(LoadError::Transport(format!("backend returned {status}")));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        tracing::debug!(rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

/// Loads a collection from the backend and decodes every row.
pub struct RestLoader<R> {
    client: RestClient,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RestLoader<R> {
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> Loader<R> for RestLoader<R> {
    fn name(&self) -> &str {
        "rest"
    }

    async fn load(&self) -> Result<Vec<R>, LoadError> {
        let rows = self.client.fetch_rows(R::KIND).await?;
        decode_rows(rows).map_err(|e| LoadError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Room;

    #[test]
    fn table_urls_use_the_rest_prefix() {
        let client = RestClient::new("https://db.example.com/", "anon", Duration::from_secs(1));
        assert_eq!(
            client.table_url(EntityKind::GuestRequests),
            "https://db.example.com/rest/v1/guest_requests"
        );
    }

    #[test]
    fn orders_follow_the_dashboard_boards() {
        assert!(query_for(EntityKind::Notifications).contains(&("order", "timestamp.desc")));
        assert!(query_for(EntityKind::GuestProfiles).contains(&("order", "created_at.desc")));
        assert!(!query_for(EntityKind::Rooms).iter().any(|(k, _)| *k == "order"));
        assert!(
            query_for(EntityKind::ServiceRequests)
                .iter()
                .any(|(k, v)| *k == "select" && v.contains("service_request_updates"))
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_load_error() {
        let client = RestClient::new("http://127.0.0.1:9", "anon", Duration::from_secs(2));
        let err = RestLoader::<Room>::new(client).load().await.unwrap_err();
        assert!(matches!(err, LoadError::Transport(_) | LoadError::Timeout));
    }
}
