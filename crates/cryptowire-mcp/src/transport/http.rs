//! Streamable-HTTP transport — session-routed `/mcp` with bearer auth, and `/health`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::protocol::EngineReply;
use crate::session::{InboundMessage, Routed, SessionRouter};
use crate::types::{
    error_codes, JsonRpcErrorObject, JsonRpcMessage, McpError, McpResult, JSONRPC_VERSION,
};

/// Header carrying the session id in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Shared server state passed to all handlers via axum State.
pub struct HttpState {
    pub router: Arc<SessionRouter>,
    pub token: String,
}

/// Streamable-HTTP transport for networked MCP clients.
pub struct HttpTransport {
    state: Arc<HttpState>,
}

impl HttpTransport {
    pub fn new(router: Arc<SessionRouter>, token: String) -> Self {
        Self {
            state: Arc::new(HttpState { router, token }),
        }
    }

    /// The axum app, without binding a socket.
    pub fn app(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve on `addr` until Ctrl-C, then drain every session.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let router = self.state.router.clone();
        let shutdown = Arc::new(Notify::new());
        let sweeper = router.spawn_sweeper(shutdown.clone());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on http://{addr}/mcp");

        let signal = {
            let router = router.clone();
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {e}");
                }
                tracing::info!("Shutting down HTTP transport");
                shutdown.notify_one();
                // Dropping the engines ends any open event streams.
                router.shutdown().await;
            }
        };

        axum::serve(listener, self.app())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        if let Err(e) = sweeper.await {
            tracing::warn!("Session sweeper ended abnormally: {e}");
        }
        Ok(())
    }
}

/// Build the axum Router. `/mcp` always sits behind the bearer check;
/// `/health` does not.
pub fn router(state: Arc<HttpState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route(
            "/mcp",
            get(handle_stream).post(handle_post).delete(handle_delete),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Auth middleware — requires `Authorization: Bearer <token>`.
async fn auth_layer(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(&state.token, token));

    if !authorized {
        tracing::debug!("Rejected unauthenticated request");
        return json_error(StatusCode::UNAUTHORIZED, &McpError::Unauthorized);
    }

    next.run(request).await
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(expected: &str, presented: &str) -> bool {
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    let mut diff = expected.len() ^ presented.len();

    for idx in 0..expected.len().max(presented.len()) {
        let left = expected.get(idx).copied().unwrap_or(0);
        let right = presented.get(idx).copied().unwrap_or(0);
        diff |= usize::from(left ^ right);
    }

    diff == 0
}

/// Error envelope with keys in `jsonrpc`, `error`, `id` order.
#[derive(Serialize)]
struct ErrorBody {
    jsonrpc: &'static str,
    error: JsonRpcErrorObject,
    id: Value,
}

fn error_response(status: StatusCode, code: i32, message: String) -> Response {
    let body = ErrorBody {
        jsonrpc: JSONRPC_VERSION,
        error: JsonRpcErrorObject {
            code,
            message,
            data: None,
        },
        id: Value::Null,
    };
    let text = serde_json::to_string(&body).unwrap_or_default();
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        text,
    )
        .into_response()
}

fn json_error(status: StatusCode, error: &McpError) -> Response {
    error_response(status, error.code(), error.to_string())
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::INTERNAL_ERROR,
        "Internal server error".to_string(),
    )
}

fn header_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// POST /mcp — route one JSON-RPC message to its session.
async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: JsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Unparseable request body: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                error_codes::PARSE_ERROR,
                "Parse error".to_string(),
            );
        }
    };

    let inbound = InboundMessage::new(header_session_id(&headers), message);
    match state.router.route(inbound).await {
        Ok(Routed {
            session_id, reply, ..
        }) => {
            let response = match reply {
                EngineReply::Response(value) => (StatusCode::OK, AxumJson(value)).into_response(),
                EngineReply::Accepted => StatusCode::ACCEPTED.into_response(),
            };
            with_session_header(response, &session_id)
        }
        Err(McpError::InvalidSession) => {
            json_error(StatusCode::BAD_REQUEST, &McpError::InvalidSession)
        }
        Err(e) => {
            tracing::error!("Failed to handle request: {e}");
            internal_error()
        }
    }
}

/// GET /mcp — server-to-client event stream for an existing session.
async fn handle_stream(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let Some(session_id) = header_session_id(&headers).or_else(|| query.get(SESSION_HEADER).cloned())
    else {
        return (StatusCode::BAD_REQUEST, "Missing mcp-session-id").into_response();
    };

    let mut rx = match state.router.open_stream(&session_id).await {
        Ok(rx) => rx,
        Err(_) => return (StatusCode::NOT_FOUND, "Session not found").into_response(),
    };
    tracing::debug!(session = %session_id, "Event stream opened");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if let Ok(json) = serde_json::to_string(&message) {
                        yield Ok::<_, Infallible>(Event::default().event("message").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    with_session_header(response, &session_id)
}

/// DELETE /mcp — end a session at the client's request.
async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    let Some(session_id) = header_session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing mcp-session-id").into_response();
    };
    match state.router.terminate(&session_id).await {
        Ok(()) => (StatusCode::OK, Body::empty()).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Session not found").into_response(),
    }
}

/// Health check endpoint — no auth required.
async fn handle_health() -> AxumJson<Value> {
    AxumJson(serde_json::json!({
        "status": "healthy",
        "transport": "streamable-http",
    }))
}
