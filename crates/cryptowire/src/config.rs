//! Upstream API configuration resolved from the environment.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openapiv1.coinstats.app";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Bearer token. Without one, requests go out unauthenticated and
    /// typically come back as `None`.
    pub api_token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl UpstreamConfig {
    /// Resolve from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    ///
    /// Unparseable timeouts fall back to the default with a warning; nothing
    /// here is fatal because every upstream failure already degrades to
    /// "data unavailable".
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("UPSTREAM_API_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_token = lookup("UPSTREAM_API_TOKEN").filter(|s| !s.trim().is_empty());

        let user_agent = lookup("UPSTREAM_USER_AGENT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(default_user_agent);

        let timeout = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        "Ignoring invalid UPSTREAM_TIMEOUT_SECS={raw:?}, using {DEFAULT_TIMEOUT_SECS}s"
                    );
                    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Self {
            base_url,
            api_token,
            user_agent,
            timeout,
        }
    }

    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }
}

fn default_user_agent() -> String {
    format!("cryptowire/{}", env!("CARGO_PKG_VERSION"))
}
