//! The seam between the session router and a per-session protocol engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::types::{JsonRpcMessage, McpResult};

/// What an engine produced for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// A JSON-RPC response (success or error envelope).
    Response(Value),
    /// The message needed no response (notification, client response).
    Accepted,
}

/// A protocol engine bound to exactly one session.
///
/// The router calls `connect` once before the session becomes visible,
/// then `handle` for every message, serialised per session.
#[async_trait]
pub trait SessionEngine: Send + Sync + 'static {
    /// Session id fixed at construction.
    fn session_id(&self) -> &str;

    /// Make the engine ready to serve. A failure discards the engine.
    async fn connect(&self) -> McpResult<()>;

    /// Handle one inbound message.
    async fn handle(&self, message: JsonRpcMessage) -> McpResult<EngineReply>;

    /// Server-to-client messages not tied to a request.
    fn subscribe(&self) -> broadcast::Receiver<Value>;

    /// True once the engine has asked for its session to end.
    fn is_terminated(&self) -> bool;

    /// Teardown hook, called once when the session leaves the table.
    async fn close(&self);
}

/// Builds a fresh engine for a newly allocated session id.
pub type EngineFactory = Arc<dyn Fn(&str) -> Box<dyn SessionEngine> + Send + Sync>;
