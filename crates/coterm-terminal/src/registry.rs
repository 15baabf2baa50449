//! `SessionRegistry`: the process-wide table of live sessions.
//!
//! This is the only piece of process-wide mutable state the core exposes.
//! It owns the sessions map and drives each session's PTY event
//! stream on a dedicated background task — sanitizing, buffering, and
//! fanning out `Data` events, and running the exit-then-grace-then-destroy
//! sequence for `Exit` events.

use crate::error::{Result, TerminalError};
use crate::pty::{PtyEvent, PtyHandle};
use crate::session::Session;
use crate::types::{ConnId, SessionId, SessionInfo, Signal, SpawnConfig, SpawnMode};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Process-wide table of sessions keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    replay_capacity: usize,
    exit_grace: Duration,
}

impl SessionRegistry {
    pub fn new(replay_capacity: usize, exit_grace: Duration) -> Arc<Self> {
        Arc::new(Self { sessions: DashMap::new(), replay_capacity, exit_grace })
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Read-only snapshot of every live session, for operational
    /// introspection (e.g. the gateway's `/health` endpoint). Not part of
    /// the wire protocol.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(sessions.len());
        for session in sessions {
            out.push(session.info().await);
        }
        out
    }

    /// Spawn a new PTY behind `id` and insert the resulting session.
    /// Rejects a duplicate id without creating a PTY.
    pub fn spawn_session(self: &Arc<Self>, id: SessionId, mode: SpawnMode, config: SpawnConfig) -> Result<Arc<Session>> {
        if self.sessions.contains_key(&id) {
            return Err(TerminalError::DuplicateSession(id.to_string()));
        }

        let (pty, events) = PtyHandle::spawn(&config)?;
        let session = Arc::new(Session::new(id.clone(), mode, config, pty, self.replay_capacity));
        self.sessions.insert(id.clone(), session.clone());

        let registry = self.clone();
        let driven = session.clone();
        tokio::spawn(async move { registry.drive(driven, events).await });

        Ok(session)
    }

    /// Drains one session's PTY event stream until exit, then removes the
    /// session from the registry after the configured grace window so
    /// in-flight `exit` frame deliveries complete.
    async fn drive(self: Arc<Self>, session: Arc<Session>, mut events: crate::pty::PtyEventStream) {
        while let Some(event) = events.recv().await {
            match event {
                PtyEvent::Data(bytes) => session.on_data(&bytes).await,
                PtyEvent::Exit { code, signal } => {
                    session.on_exit(code, signal).await;
                    tokio::time::sleep(self.exit_grace).await;
                    self.sessions.remove(&session.id);
                    session.mark_destroyed().await;
                    info!(session_id = %session.id, exit_code = code, "session destroyed");
                    return;
                }
            }
        }
    }

    /// Detach `conn_id` from every session, without destroying any of them.
    /// Called on every client disconnect, so it must not pay a per-session
    /// async-lock-acquire cost any worse than necessary — it's
    /// O(sessions), never O(conns).
    pub async fn remove_client(&self, conn_id: &ConnId) {
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|e| e.value().clone()).collect();
        for session in sessions {
            session.detach(conn_id).await;
        }
    }

    /// Process shutdown: signal every live PTY and clear the table. No
    /// replay is expected across a restart, so sessions are simply dropped,
    /// not gracefully exited.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = self.sessions.iter().map(|e| e.value().clone()).collect();
        for session in sessions {
            if let Err(e) = session.kill(Signal::Term).await {
                warn!(session_id = %session.id, error = %e, "failed to signal session during shutdown");
            }
        }
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> SpawnConfig {
        SpawnConfig { shell: "/bin/sh".into(), cwd: "/tmp".into(), cols: 80, rows: 24, env: HashMap::new() }
    }

    #[tokio::test]
    async fn duplicate_spawn_is_rejected_without_touching_the_pty() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(10));
        let id = SessionId::from("dup");
        registry.spawn_session(id.clone(), SpawnMode::Shell, test_config()).expect("first spawn");

        let err = registry.spawn_session(id.clone(), SpawnMode::Shell, test_config()).unwrap_err();
        assert!(matches!(err, TerminalError::DuplicateSession(_)));
        // still exactly one session under that id.
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn get_on_unknown_id_is_none() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(10));
        assert!(registry.get(&SessionId::from("nope")).is_none());
    }

    #[tokio::test]
    async fn exit_removes_session_after_grace_window() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(20));
        let id = SessionId::from("a");
        let session = registry.spawn_session(id.clone(), SpawnMode::Shell, test_config()).expect("spawn");
        session.kill(Signal::Term).await.expect("signal");

        // Immediately after kill the session may still be reachable while
        // the PTY drains and the exit event has not yet propagated.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(registry.get(&id).is_none(), "session should be destroyed and removed after grace");
    }
}
