//! Server configuration loading and resolution.

use std::time::Duration;

use cryptowire::UpstreamConfig;

use crate::session::router::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3100;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("An auth token is required for the HTTP transport (set MCP_AUTH_TOKEN or pass --token)")]
    MissingAuthToken,
}

/// Settings for the MCP server itself. Upstream settings live in
/// [`UpstreamConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth_token: Option<String>,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub upstream: UpstreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            auth_token: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = non_blank(lookup("HOST")).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_blank(lookup("PORT")) {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        let auth_token = non_blank(lookup("MCP_AUTH_TOKEN"));
        let idle_timeout = parse_secs("MCP_SESSION_IDLE_SECS", lookup("MCP_SESSION_IDLE_SECS"))?
            .unwrap_or(DEFAULT_IDLE_TIMEOUT);
        let sweep_interval =
            parse_secs("MCP_SESSION_SWEEP_SECS", lookup("MCP_SESSION_SWEEP_SECS"))?
                .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        Ok(Self {
            host,
            port,
            auth_token,
            idle_timeout,
            sweep_interval,
            upstream: UpstreamConfig::from_lookup(&lookup),
        })
    }

    /// Apply CLI overrides on top of the resolved values.
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        token: Option<String>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = non_blank(host) {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(token) = non_blank(token) {
            self.auth_token = Some(token);
        }
        if let Some(secs) = idle_timeout_secs {
            self.idle_timeout = positive_secs("--idle-timeout", secs)?;
        }
        Ok(self)
    }

    /// The HTTP transport refuses to run unauthenticated.
    pub fn require_auth_token(&self) -> Result<&str, ConfigError> {
        self.auth_token.as_deref().ok_or(ConfigError::MissingAuthToken)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn positive_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            value: secs.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_secs(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    match non_blank(raw) {
        Some(raw) => {
            let secs = parse_number::<u64>(name, &raw)?;
            positive_secs(name, secs).map(Some)
        }
        None => Ok(None),
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
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.auth_token.is_none());
        assert_eq!(config.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert_eq!(config.require_auth_token(), Err(ConfigError::MissingAuthToken));
    }

    #[test]
    fn test_env_values() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("MCP_AUTH_TOKEN", "secret"),
            ("MCP_SESSION_IDLE_SECS", "90"),
            ("UPSTREAM_API_TOKEN", "upstream"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.require_auth_token(), Ok("secret"));
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert!(config.upstream.has_token());
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));

        let err =
            ServerConfig::from_lookup(lookup(&[("MCP_SESSION_SWEEP_SECS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "MCP_SESSION_SWEEP_SECS", .. }
        ));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "8080"), ("MCP_AUTH_TOKEN", "env")]))
            .unwrap()
            .with_overrides(None, Some(9000), Some("cli".to_string()), Some(5))
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth_token.as_deref(), Some("cli"));
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
