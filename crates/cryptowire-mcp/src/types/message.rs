//! JSON-RPC 2.0 message types for the MCP protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::capabilities::InitializeParams;

/// JSON-RPC 2.0 protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Unique request identifier — can be string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JsonRpcErrorObject,
}

/// Error object within a JSON-RPC error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Union type for any JSON-RPC message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Error(JsonRpcError),
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.method),
            JsonRpcMessage::Notification(notif) => Some(&notif.method),
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => None,
        }
    }

    /// True for a well-formed `initialize` request: its params must decode
    /// as [`InitializeParams`]. Notifications never qualify.
    pub fn is_initialize_request(&self) -> bool {
        match self {
            JsonRpcMessage::Request(req) if req.method == "initialize" => req
                .params
                .as_ref()
                .is_some_and(|params| InitializeParams::deserialize(params).is_ok()),
            _ => false,
        }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.id),
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => Some(&err.id),
            JsonRpcMessage::Notification(_) => None,
        }
    }
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

impl JsonRpcError {
    pub fn new(id: RequestId, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code,
                message,
                data: None,
            },
        }
    }
}

impl JsonRpcNotification {
    pub fn new(method: String, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> JsonRpcMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_untagged_dispatch() {
        let req = parse(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }));
        assert!(matches!(req, JsonRpcMessage::Request(_)));
        assert_eq!(req.method(), Some("tools/list"));
        assert_eq!(req.request_id(), Some(&RequestId::Number(1)));

        let notif = parse(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
        assert!(matches!(notif, JsonRpcMessage::Notification(_)));
        assert!(notif.request_id().is_none());

        let resp = parse(json!({ "jsonrpc": "2.0", "id": "a", "result": {} }));
        assert!(matches!(resp, JsonRpcMessage::Response(_)));
        assert!(resp.method().is_none());
    }

    #[test]
    fn test_initialize_predicate() {
        let init = parse(json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "c", "version": "1" }
            }
        }));
        assert!(init.is_initialize_request());

        let bare = parse(json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize" }));
        assert!(!bare.is_initialize_request());

        let empty = parse(json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }));
        assert!(!empty.is_initialize_request());

        // An initialize without an id is a notification, not a handshake.
        let notif = parse(json!({ "jsonrpc": "2.0", "method": "initialize" }));
        assert!(!notif.is_initialize_request());

        let other = parse(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }));
        assert!(!other.is_initialize_request());
    }
}
