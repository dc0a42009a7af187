//! HTTP transport for the registry REST API.
//!
//! Builds URLs from path segments (subjects are percent-encoded, never
//! concatenated), sends the registry content type, and turns non-2xx responses
//! into classified [`RegistryError`]s.

use crate::error::{ApiError, RegistryError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Content type spoken by Confluent-compatible registries
pub const SCHEMA_REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

const ACCEPT_VALUE: &str = "application/vnd.schemaregistry.v1+json, application/json";

/// Connection settings for a registry
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// Base URL, e.g. `http://localhost:8081`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl RegistryClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("schemaflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// REST transport bound to one registry
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: Url,
    client: Client,
}

impl RestClient {
    pub fn new(config: &RegistryClientConfig) -> Result<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|e| {
            RegistryError::InvalidArgument(format!("invalid registry URL '{}': {}", trimmed, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::InvalidArgument(format!(
                "registry URL '{}' cannot carry a path",
                trimmed
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                RegistryError::InvalidArgument(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments (and optional query pairs) against the base URL.
    pub fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    pub async fn get<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        tracing::trace!(%url, "GET");
        self.send(self.client.get(url)).await
    }

    pub async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<R> {
        tracing::trace!(%url, "POST");
        self.send(self.client.post(url).header(CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE).json(body))
            .await
    }

    pub async fn put<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<R> {
        tracing::trace!(%url, "PUT");
        self.send(self.client.put(url).header(CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE).json(body))
            .await
    }

    pub async fn delete_json<R: DeserializeOwned>(&self, url: Url) -> Result<R> {
        tracing::trace!(%url, "DELETE");
        self.send(self.client.delete(url)).await
    }

    /// Issue a GET and report only whether it returned 2xx.
    pub async fn reachable(&self, url: Url) -> bool {
        match self.client.get(url).header(ACCEPT, ACCEPT_VALUE).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Registry health check failed");
                false
            }
        }
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request
            .header(ACCEPT, ACCEPT_VALUE)
            .send()
            .await
            .map_err(RegistryError::Unavailable)?;

        let status = response.status();
        let body = response.text().await.map_err(RegistryError::Unavailable)?;

        if !status.is_success() {
            let api = ApiError::from_body(status.as_u16(), &body);
            tracing::debug!(status = api.status, error_code = ?api.error_code, message = %api.message, "Registry returned an error");
            return Err(RegistryError::from_api(api));
        }

        serde_json::from_str(&body).map_err(|e| {
            RegistryError::Protocol(format!("{} (body: {})", e, truncate(&body, 256)))
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
