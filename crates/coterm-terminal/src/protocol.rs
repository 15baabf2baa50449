//! `TerminalProtocol`: maps inbound `terminal:*` frames onto `Session` /
//! `SessionRegistry` operations and emits the outbound frames that answer
//! them. This is the only module gateway code needs to call into —
//! it owns all of the cross-cutting wire-level rules (duplicate spawn,
//! unknown session, permitted signals) so the transport layer stays a thin
//! decode/classify/dispatch loop.

use crate::error::TerminalError;
use crate::registry::SessionRegistry;
use crate::session::OutboundSink;
use crate::types::{ConnId, SessionId, Signal, SpawnConfig, SpawnMode, DEFAULT_COLS, DEFAULT_ROWS, MAX_DIM, MIN_DIM};
use coterm_protocol::frames::{InboundTerminalFrame, OutboundTerminalFrame, SpawnConfigWire};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle one inbound terminal frame from `conn_id`/`conn`, dispatching to
/// `registry` and pushing any resulting outbound frame(s) back through
/// `conn` (and, for live `output`/`exit` traffic, through every other
/// attached conn — handled inside `Session` itself).
pub async fn handle(
    frame: InboundTerminalFrame,
    conn_id: &ConnId,
    conn: &Arc<dyn OutboundSink>,
    registry: &Arc<SessionRegistry>,
) {
    match frame {
        InboundTerminalFrame::Spawn { session_id, mode, config } => {
            handle_spawn(SessionId::from(session_id), mode.into(), config, conn_id, conn, registry).await
        }
        InboundTerminalFrame::Input { session_id, data } => {
            let session_id = SessionId::from(session_id);
            match registry.get(&session_id) {
                Some(session) => {
                    let _ = session.input(data.as_bytes()).await;
                }
                None => conn.send(unknown_session_frame(&session_id)),
            }
        }
        InboundTerminalFrame::Resize { session_id, cols, rows } => {
            let session_id = SessionId::from(session_id);
            match registry.get(&session_id) {
                Some(session) => {
                    if let Err(e) = session.resize(cols, rows).await {
                        conn.send(error_frame(&session_id, &e));
                    }
                }
                None => conn.send(unknown_session_frame(&session_id)),
            }
        }
        InboundTerminalFrame::Kill { session_id, signal } => {
            handle_kill(SessionId::from(session_id), signal, conn, registry).await
        }
        InboundTerminalFrame::Replay { session_id } => {
            handle_replay(SessionId::from(session_id), conn_id, conn, registry).await
        }
    }
}

async fn handle_spawn(
    session_id: SessionId,
    mode: SpawnMode,
    config: SpawnConfigWire,
    conn_id: &ConnId,
    conn: &Arc<dyn OutboundSink>,
    registry: &Arc<SessionRegistry>,
) {
    let spawn_config = to_spawn_config(config);
    match registry.spawn_session(session_id.clone(), mode, spawn_config) {
        Ok(session) => {
            session.attach(conn_id.clone(), conn.clone()).await;
            info!(session_id = %session_id, pid = session.pid(), "session spawned");
            conn.send(OutboundTerminalFrame::Spawned { session_id: session_id.to_string(), pid: session.pid() });
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "spawn rejected");
            conn.send(error_frame(&session_id, &e));
        }
    }
}

async fn handle_kill(
    session_id: SessionId,
    signal: Option<String>,
    conn: &Arc<dyn OutboundSink>,
    registry: &Arc<SessionRegistry>,
) {
    let sig = match signal {
        None => Signal::Term,
        Some(name) => match Signal::parse(&name) {
            Some(sig) => sig,
            None => {
                conn.send(error_frame(&session_id, &TerminalError::SignalNotPermitted(name)));
                return;
            }
        },
    };

    match registry.get(&session_id) {
        Some(session) => {
            if let Err(e) = session.kill(sig).await {
                conn.send(error_frame(&session_id, &e));
            }
        }
        None => conn.send(unknown_session_frame(&session_id)),
    }
}

async fn handle_replay(
    session_id: SessionId,
    conn_id: &ConnId,
    conn: &Arc<dyn OutboundSink>,
    registry: &Arc<SessionRegistry>,
) {
    match registry.get(&session_id) {
        Some(session) => {
            // Attaching here, even for a conn that never saw `spawn`, is
            // intentional — it's how a reconnecting client rejoins fan-out.
            // `attach_and_snapshot` does both under one lock so the PTY data
            // handler can't append and fan out a live frame in between,
            // which would otherwise double-deliver the same bytes.
            if let Some(bytes) = session.attach_and_snapshot(conn_id.clone(), conn.clone()).await {
                if !bytes.is_empty() {
                    conn.send(OutboundTerminalFrame::ReplayData {
                        session_id: session_id.to_string(),
                        data: String::from_utf8_lossy(&bytes).into_owned(),
                    });
                }
            }
        }
        None => conn.send(unknown_session_frame(&session_id)),
    }
}

/// The shell is resolved through the allow-list inside `PtyHandle::spawn`,
/// not here — this just defaults/clamps dimensions the way the wire
/// contract promises.
fn to_spawn_config(wire: SpawnConfigWire) -> SpawnConfig {
    SpawnConfig {
        shell: wire.shell,
        cwd: wire.cwd,
        cols: wire.cols.filter(|&c| c != 0).unwrap_or(DEFAULT_COLS).clamp(MIN_DIM, MAX_DIM),
        rows: wire.rows.filter(|&r| r != 0).unwrap_or(DEFAULT_ROWS).clamp(MIN_DIM, MAX_DIM),
        env: wire.env,
    }
}

fn unknown_session_frame(session_id: &SessionId) -> OutboundTerminalFrame {
    OutboundTerminalFrame::Error { session_id: session_id.to_string(), error: "Session not found".to_string() }
}

fn error_frame(session_id: &SessionId, e: &TerminalError) -> OutboundTerminalFrame {
    OutboundTerminalFrame::Error { session_id: session_id.to_string(), error: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct RecordingSink {
        frames: StdMutex<Vec<OutboundTerminalFrame>>,
        open: AtomicBool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self { frames: StdMutex::new(Vec::new()), open: AtomicBool::new(true) })
        }
    }

    impl OutboundSink for RecordingSink {
        fn send(&self, frame: OutboundTerminalFrame) {
            self.frames.lock().unwrap().push(frame);
        }
        fn is_open(&self) -> bool {
            self.open.load(Ordering::Acquire)
        }
    }

    fn spawn_frame(session_id: &str) -> InboundTerminalFrame {
        InboundTerminalFrame::Spawn {
            session_id: session_id.to_string(),
            mode: coterm_protocol::frames::SpawnMode::Shell,
            config: SpawnConfigWire {
                shell: "/bin/sh".to_string(),
                cwd: "/tmp".to_string(),
                cols: Some(80),
                rows: Some(24),
                env: Default::default(),
            },
        }
    }

    #[tokio::test]
    async fn spawn_then_duplicate_spawn_is_rejected() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(20));
        let conn_id = ConnId::new();
        let sink = RecordingSink::new();
        let conn: Arc<dyn OutboundSink> = sink.clone();

        handle(spawn_frame("a"), &conn_id, &conn, &registry).await;
        handle(spawn_frame("a"), &conn_id, &conn, &registry).await;

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], OutboundTerminalFrame::Spawned { .. }));
        assert!(matches!(frames[1], OutboundTerminalFrame::Error { .. }));
    }

    #[tokio::test]
    async fn unknown_session_input_yields_exact_error_text() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(20));
        let conn_id = ConnId::new();
        let sink = RecordingSink::new();
        let conn: Arc<dyn OutboundSink> = sink.clone();

        handle(
            InboundTerminalFrame::Input { session_id: "missing".into(), data: "x".into() },
            &conn_id,
            &conn,
            &registry,
        )
        .await;

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            OutboundTerminalFrame::Error { session_id, error } => {
                assert_eq!(session_id, "missing");
                assert_eq!(error, "Session not found");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn kill_with_disallowed_signal_is_rejected() {
        let registry = SessionRegistry::new(1024, Duration::from_millis(20));
        let conn_id = ConnId::new();
        let sink = RecordingSink::new();
        let conn: Arc<dyn OutboundSink> = sink.clone();

        handle(spawn_frame("a"), &conn_id, &conn, &registry).await;
        handle(
            InboundTerminalFrame::Kill { session_id: "a".into(), signal: Some("SIGUSR1".into()) },
            &conn_id,
            &conn,
            &registry,
        )
        .await;

        let frames = sink.frames.lock().unwrap();
        assert!(matches!(frames.last(), Some(OutboundTerminalFrame::Error { .. })));
    }
}
