//! Session table and routing of inbound messages to per-session engines.

pub mod router;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::protocol::SessionEngine;
use crate::types::JsonRpcMessage;

pub use router::{Routed, SessionRouter};

/// One inbound message as seen by the router.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub session_id: Option<String>,
    pub body: JsonRpcMessage,
}

impl InboundMessage {
    pub fn new(session_id: Option<String>, body: JsonRpcMessage) -> Self {
        Self { session_id, body }
    }

    /// True iff the body is an `initialize` request.
    pub fn is_handshake(&self) -> bool {
        self.body.is_initialize_request()
    }
}

/// A live client session bound to exactly one engine.
pub struct Session {
    pub id: String,
    engine: Box<dyn SessionEngine>,
    pub created_at: DateTime<Utc>,
    last_activity: Mutex<Instant>,
    /// Serialises dispatch; tokio's mutex is FIFO-fair.
    dispatch: tokio::sync::Mutex<()>,
}

impl Session {
    pub fn new(id: String, engine: Box<dyn SessionEngine>) -> Self {
        Self {
            id,
            engine,
            created_at: Utc::now(),
            last_activity: Mutex::new(Instant::now()),
            dispatch: tokio::sync::Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &dyn SessionEngine {
        self.engine.as_ref()
    }

    pub fn touch(&self) {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }

    /// True while a message is being dispatched or queued.
    pub fn is_busy(&self) -> bool {
        self.dispatch.try_lock().is_err()
    }
}
