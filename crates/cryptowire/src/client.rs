//! HTTP client for the upstream market data API.
//!
//! Every failure (network, non-2xx status, malformed JSON) collapses to
//! `None` at [`ApiClient::request`]. Callers treat `None` as "data
//! unavailable" and degrade to an explanatory text.

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::types::{CryptowireError, CryptowireResult};

/// Upstream API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl ApiClient {
    pub fn new(config: UpstreamConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    "Could not build HTTP client ({e}); using defaults without the configured timeout and user agent"
                );
                reqwest::Client::new()
            });

        Self { client, config }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// GET `path` with `query`, returning the parsed body or `None`.
    pub async fn request(&self, path: &str, query: &[(&str, String)]) -> Option<Value> {
        match self.try_request(path, query).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Upstream request failed: {e}");
                None
            }
        }
    }

    /// Like [`request`](Self::request), then decodes into `T`.
    ///
    /// A body that parses as JSON but not as `T` is also `None`.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Option<T> {
        let value = self.request(path, query).await?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Unexpected response shape from {path}: {e}");
                None
            }
        }
    }

    /// The fallible request behind [`request`](Self::request).
    pub async fn try_request(&self, path: &str, query: &[(&str, String)]) -> CryptowireResult<Value> {
        let url = self.url_for(path)?;

        let mut builder = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!("GET {path}");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CryptowireError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| CryptowireError::Decode {
            path: path.to_string(),
            source,
        })
    }

    fn url_for(&self, path: &str) -> CryptowireResult<reqwest::Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.config.base_url)
        } else {
            format!("{}/{path}", self.config.base_url)
        };
        reqwest::Url::parse(&joined).map_err(|e| CryptowireError::InvalidUrl(format!("{joined}: {e}")))
    }
}
