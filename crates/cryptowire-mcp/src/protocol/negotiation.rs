//! MCP capability negotiation during initialization.

use crate::types::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, McpError, McpResult,
    MCP_VERSION, SUPPORTED_VERSIONS,
};

/// Stored client capabilities after negotiation.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub protocol_version: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    /// Negotiate once per session; a second `initialize` is rejected.
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        if self.protocol_version.is_some() {
            return Err(McpError::InvalidRequest(
                "Session already initialized".to_string(),
            ));
        }

        let version = if SUPPORTED_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version.clone()
        } else {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
            MCP_VERSION.to_string()
        };

        tracing::info!(
            "Initialized with client: {} v{} (protocol {version})",
            params.client_info.name,
            params.client_info.version
        );

        self.client = params.capabilities;
        self.client_info = Some(params.client_info);
        self.protocol_version = Some(version.clone());

        Ok(InitializeResult::for_version(&version))
    }

    pub fn mark_initialized(&mut self) -> McpResult<()> {
        if self.protocol_version.is_none() {
            return Err(McpError::InvalidRequest(
                "initialized notification before initialize".to_string(),
            ));
        }
        self.initialized = true;
        tracing::info!("MCP handshake complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(version: &str) -> InitializeParams {
        InitializeParams {
            protocol_version: version.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "test".to_string(),
                version: "1.0".to_string(),
            },
        }
    }

    #[test]
    fn test_supported_version_is_echoed() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps.negotiate(params("2024-11-05")).unwrap();
        assert_eq!(result.protocol_version, "2024-11-05");
    }

    #[test]
    fn test_unknown_version_falls_back() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps.negotiate(params("2099-01-01")).unwrap();
        assert_eq!(result.protocol_version, MCP_VERSION);
    }

    #[test]
    fn test_second_initialize_rejected() {
        let mut caps = NegotiatedCapabilities::default();
        caps.negotiate(params(MCP_VERSION)).unwrap();
        assert!(caps.negotiate(params(MCP_VERSION)).is_err());
    }

    #[test]
    fn test_initialized_requires_negotiation() {
        let mut caps = NegotiatedCapabilities::default();
        assert!(caps.mark_initialized().is_err());
        caps.negotiate(params(MCP_VERSION)).unwrap();
        caps.mark_initialized().unwrap();
        assert!(caps.initialized);
    }
}
