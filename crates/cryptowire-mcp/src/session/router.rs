//! Resolves, creates and retires sessions, and dispatches messages to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, Notify, RwLock};
use tokio::task::JoinHandle;

use crate::protocol::{EngineFactory, EngineReply, SessionEngine};
use crate::types::{McpError, McpResult};

use super::{InboundMessage, Session};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of routing one message.
#[derive(Debug, Clone)]
pub struct Routed {
    pub session_id: String,
    /// True when this message created the session.
    pub created: bool,
    pub reply: EngineReply,
}

/// Owns the session table. Every insert and removal goes through here.
pub struct SessionRouter {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    factory: EngineFactory,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl SessionRouter {
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Route one inbound message to its session, creating the session on
    /// a handshake without an id.
    ///
    /// A present but unknown id is rejected even when the body is a
    /// handshake. Rejections leave the table untouched.
    pub async fn route(&self, message: InboundMessage) -> McpResult<Routed> {
        let handshake = message.is_handshake();
        let InboundMessage { session_id, body } = message;

        let (session, created) = match session_id {
            Some(id) => match self.resolve(&id).await {
                Some(session) => (session, false),
                None => {
                    tracing::debug!(session = %id, "Rejecting message for unknown session");
                    return Err(McpError::InvalidSession);
                }
            },
            None if handshake => (self.create().await?, true),
            None => {
                tracing::debug!("Rejecting non-handshake message without session id");
                return Err(McpError::InvalidSession);
            }
        };

        let handled = {
            let _guard = session.dispatch.lock().await;
            session.touch();
            session.engine().handle(body).await
        };
        let reply = match handled {
            Ok(reply) => reply,
            Err(e) => {
                // Nobody learns the id of a session whose handshake failed.
                if created {
                    tracing::warn!(session = %session.id, "Handshake failed, discarding session: {e}");
                    self.retire(&session).await;
                }
                return Err(e);
            }
        };

        if session.engine().is_terminated() {
            tracing::info!(session = %session.id, "Engine requested termination");
            self.retire(&session).await;
        }

        Ok(Routed {
            session_id: session.id.clone(),
            created,
            reply,
        })
    }

    /// Subscribe to a session's server-to-client messages.
    pub async fn open_stream(&self, session_id: &str) -> McpResult<broadcast::Receiver<Value>> {
        let session = self
            .resolve(session_id)
            .await
            .ok_or_else(|| McpError::SessionNotFound(session_id.to_string()))?;
        Ok(session.engine().subscribe())
    }

    /// Remove and close a session at the client's request.
    pub async fn terminate(&self, session_id: &str) -> McpResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| McpError::SessionNotFound(session_id.to_string()))?;
        tracing::info!(session = %session_id, "Session terminated by client");
        session.engine().close().await;
        Ok(())
    }

    /// Remove sessions idle longer than the idle timeout. Sessions with a
    /// dispatch in flight are kept. Returns the number removed.
    pub async fn sweep_idle(&self) -> usize {
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| s.idle_for() > self.idle_timeout && !s.is_busy())
                .map(|s| s.id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            tracing::info!(
                session = %session.id,
                created_at = %session.created_at,
                "Closing idle session"
            );
            session.engine().close().await;
        }
        expired.len()
    }

    /// Run `sweep_idle` on an interval until `shutdown` is notified.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: Arc<Notify>) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            let period = router.sweep_interval;
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::debug!(
                "Session sweeper started (every {}s, idle timeout {}s)",
                period.as_secs(),
                router.idle_timeout.as_secs()
            );
            loop {
                tokio::select! {
                    _ = shutdown.notified() => {
                        tracing::debug!("Session sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = router.sweep_idle().await;
                        if removed > 0 {
                            tracing::info!("Swept {removed} idle session(s)");
                        }
                    }
                }
            }
        })
    }

    /// Drain the table and close every engine.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        if !drained.is_empty() {
            tracing::info!("Closing {} session(s)", drained.len());
        }
        for session in drained {
            session.engine().close().await;
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Look up a session and mark it active while the table lock is held,
    /// so a concurrent sweep cannot treat it as idle.
    async fn resolve(&self, session_id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(session_id)?;
        session.touch();
        Some(Arc::clone(session))
    }

    async fn create(&self) -> McpResult<Arc<Session>> {
        let id = uuid::Uuid::new_v4().to_string();
        let engine = (self.factory)(&id);

        if let Err(e) = engine.connect().await {
            tracing::error!(session = %id, "Engine failed to connect: {e}");
            return Err(e);
        }

        let session = Arc::new(Session::new(id.clone(), engine));
        self.sessions.write().await.insert(id.clone(), Arc::clone(&session));
        tracing::info!(session = %id, "Session created");
        Ok(session)
    }

    /// Remove `session` if it is still the table's entry for its id.
    async fn retire(&self, session: &Arc<Session>) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            match sessions.get(&session.id) {
                Some(current) if Arc::ptr_eq(current, session) => sessions.remove(&session.id),
                _ => None,
            }
        };
        if let Some(session) = removed {
            session.engine().close().await;
        }
    }
}
