//! JSON-RPC message validation per MCP spec.

use crate::types::{JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    // JSON-RPC 2.0 reserves the rpc. prefix for internal methods.
    if request.method.starts_with("rpc.") {
        return Err(McpError::InvalidRequest(format!(
            "Reserved method name: {}",
            request.method
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;

    fn request(jsonrpc: &str, method: &str) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: jsonrpc.to_string(),
            id: RequestId::Number(1),
            method: method.to_string(),
            params: None,
        }
    }

    #[test]
    fn test_accepts_well_formed() {
        assert!(validate_request(&request("2.0", "tools/list")).is_ok());
    }

    #[test]
    fn test_rejects_bad_version_empty_and_reserved() {
        assert!(validate_request(&request("1.0", "ping")).is_err());
        assert!(validate_request(&request("2.0", "")).is_err());
        let err = validate_request(&request("2.0", "rpc.discover")).unwrap_err();
        assert_eq!(err.code(), -32600);
    }
}
