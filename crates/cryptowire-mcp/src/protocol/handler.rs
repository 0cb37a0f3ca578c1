//! Main request dispatcher — receives JSON-RPC messages, routes to handlers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};

use cryptowire::ApiClient;

use crate::tools::ToolRegistry;
use crate::types::*;

use super::engine::{EngineFactory, EngineReply, SessionEngine};
use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Capacity of the per-session server-to-client channel.
const OUTBOUND_CAPACITY: usize = 64;

/// Logger name attached to `notifications/message`.
const LOGGER: &str = "cryptowire";

/// The protocol engine for one session.
pub struct ProtocolHandler {
    session_id: String,
    api: ApiClient,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
    min_log_level: Mutex<LogLevel>,
    outbound: broadcast::Sender<Value>,
    connected: AtomicBool,
    terminated: AtomicBool,
    tool_calls: AtomicU64,
}

impl ProtocolHandler {
    pub fn new(session_id: impl Into<String>, api: ApiClient) -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            session_id: session_id.into(),
            api,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
            min_log_level: Mutex::new(LogLevel::Info),
            outbound,
            connected: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            tool_calls: AtomicU64::new(0),
        }
    }

    /// A factory producing one handler per session, all sharing `api`.
    pub fn factory(api: ApiClient) -> EngineFactory {
        Arc::new(move |session_id: &str| {
            Box::new(ProtocolHandler::new(session_id, api.clone())) as Box<dyn SessionEngine>
        })
    }

    /// Number of `tools/call` requests this session has completed.
    pub fn tool_call_count(&self) -> u64 {
        self.tool_calls.load(Ordering::Relaxed)
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!(
                    session = %self.session_id,
                    "Received unexpected message type from client"
                );
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        let result = self.dispatch_request(&request).await;

        match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(session = %self.session_id, method = %request.method, "Request failed: {e}");
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "shutdown" => self.handle_shutdown().await,
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            "logging/setLevel" => self.handle_set_level(request.params.clone()).await,

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                let mut caps = self.capabilities.lock().await;
                if let Err(e) = caps.mark_initialized() {
                    tracing::error!(session = %self.session_id, "Failed to mark initialized: {e}");
                }
            }
            "notifications/cancelled" => {
                let params: Option<CancelRequestParams> = notification
                    .params
                    .and_then(|p| serde_json::from_value(p).ok());
                match params {
                    Some(p) => tracing::info!(
                        session = %self.session_id,
                        "Client cancelled request {}: {}",
                        p.request_id,
                        p.reason.as_deref().unwrap_or("no reason given")
                    ),
                    None => tracing::info!(session = %self.session_id, "Received cancellation notification"),
                }
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init_params)?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!(session = %self.session_id, "Shutdown requested");
        self.terminated.store(true, Ordering::SeqCst);
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let outcome =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.api).await?;
        self.tool_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(what) = outcome.unavailable {
            self.notify(
                LogLevel::Warning,
                json!({
                    "tool": call_params.name,
                    "message": format!("Failed to fetch {what}"),
                }),
            )
            .await;
        }

        serde_json::to_value(outcome.result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_set_level(&self, params: Option<Value>) -> McpResult<Value> {
        let level_params: SetLevelParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Level params required".to_string()))?;

        *self.min_log_level.lock().await = level_params.level;
        tracing::debug!(session = %self.session_id, "Log level set to {:?}", level_params.level);
        Ok(Value::Object(serde_json::Map::new()))
    }

    /// Publish a log notification if it clears the session's level.
    async fn notify(&self, level: LogLevel, data: Value) {
        if level < *self.min_log_level.lock().await {
            return;
        }
        let notification = JsonRpcNotification::log(level, LOGGER, data);
        match serde_json::to_value(notification) {
            // No receivers just means no stream is open.
            Ok(value) => {
                let _ = self.outbound.send(value);
            }
            Err(e) => tracing::error!("Failed to serialize notification: {e}"),
        }
    }
}

#[async_trait]
impl SessionEngine for ProtocolHandler {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn connect(&self) -> McpResult<()> {
        ToolRegistry::verify()?;
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!(session = %self.session_id, "Engine connected");
        Ok(())
    }

    async fn handle(&self, message: JsonRpcMessage) -> McpResult<EngineReply> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::NotConnected);
        }
        Ok(match self.handle_message(message).await {
            Some(value) => EngineReply::Response(value),
            None => EngineReply::Accepted,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.outbound.subscribe()
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.terminated.store(true, Ordering::SeqCst);
        tracing::debug!(
            session = %self.session_id,
            tool_calls = self.tool_call_count(),
            "Engine closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptowire::UpstreamConfig;
    use std::time::Duration;

    fn offline_api() -> ApiClient {
        // Port 9 (discard) on loopback refuses connections in test sandboxes.
        ApiClient::new(UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..UpstreamConfig::default()
        })
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcMessage {
        serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": id, "method": method, "params": params
        }))
        .unwrap()
    }

    fn initialize() -> JsonRpcMessage {
        request(
            0,
            "initialize",
            json!({
                "protocolVersion": MCP_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "1.0" }
            }),
        )
    }

    async fn connected() -> ProtocolHandler {
        let handler = ProtocolHandler::new("s1", offline_api());
        handler.connect().await.unwrap();
        handler
    }

    fn response(reply: EngineReply) -> Value {
        match reply {
            EngineReply::Response(v) => v,
            EngineReply::Accepted => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_handle_before_connect_fails() {
        let handler = ProtocolHandler::new("s1", offline_api());
        let err = handler.handle(initialize()).await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected));
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let handler = connected().await;

        let init = response(handler.handle(initialize()).await.unwrap());
        assert_eq!(init["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(init["id"], 0);

        let notif: JsonRpcMessage = serde_json::from_value(
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        )
        .unwrap();
        assert_eq!(handler.handle(notif).await.unwrap(), EngineReply::Accepted);

        let list = response(handler.handle(request(1, "tools/list", json!({}))).await.unwrap());
        assert_eq!(list["result"]["tools"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let handler = connected().await;

        let resp = response(handler.handle(request(2, "resources/list", json!({}))).await.unwrap());
        assert_eq!(resp["error"]["code"], -32601);

        let resp = response(
            handler
                .handle(request(3, "tools/call", json!({ "name": "nope" })))
                .await
                .unwrap(),
        );
        assert_eq!(resp["error"]["code"], -32803);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_invalid_params() {
        let handler = connected().await;
        let resp = response(
            handler
                .handle(request(
                    4,
                    "tools/call",
                    json!({ "name": "get_news", "arguments": { "type": "sideways" } }),
                ))
                .await
                .unwrap(),
        );
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_unavailable_upstream_is_text_plus_warning() {
        let handler = connected().await;
        let mut rx = handler.subscribe();

        let resp = response(
            handler
                .handle(request(
                    5,
                    "tools/call",
                    json!({ "name": "get_market_overview", "arguments": {} }),
                ))
                .await
                .unwrap(),
        );
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Failed to fetch"), "{text}");
        assert_eq!(handler.tool_call_count(), 1);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification["method"], "notifications/message");
        assert_eq!(notification["params"]["level"], "warning");
        assert_eq!(notification["params"]["data"]["tool"], "get_market_overview");
    }

    #[tokio::test]
    async fn test_set_level_filters_notifications() {
        let handler = connected().await;
        let mut rx = handler.subscribe();

        let resp = response(
            handler
                .handle(request(6, "logging/setLevel", json!({ "level": "error" })))
                .await
                .unwrap(),
        );
        assert!(resp["result"].is_object());

        handler
            .handle(request(
                7,
                "tools/call",
                json!({ "name": "get_market_overview", "arguments": {} }),
            ))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_terminates() {
        let handler = connected().await;
        assert!(!handler.is_terminated());
        handler.handle(request(8, "shutdown", json!({}))).await.unwrap();
        assert!(handler.is_terminated());
    }
}
