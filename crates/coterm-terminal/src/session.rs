//! `Session`: one PTY + one replay buffer + a set of attached clients.
//!
//! A session owns exactly one [`PtyHandle`] and orchestrates fan-out of its
//! output to every attached client, sanitizing and buffering each chunk
//! along the way. Client attachment is independent of the PTY's lifetime —
//! a client can disconnect and reconnect later and still replay what it
//! missed, up to the buffer's capacity.
//!
//! Internal state lives behind a single `tokio::sync::Mutex` per session, so
//! `attach`/`detach`/`input`/`resize`/`kill`/`replay_snapshot` and the PTY
//! output handler all serialize through one logical per-session loop even
//! though the process itself runs on a multi-threaded executor.

use crate::error::Result;
use crate::pty::PtyHandle;
use crate::replay::ReplayBuffer;
use crate::sanitizer::SanitizerFilter;
use crate::types::{now_unix, ConnId, SessionId, SessionInfo, Signal, SpawnConfig, SpawnMode};
use coterm_protocol::frames::OutboundTerminalFrame;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A sink a `Session` can push outbound frames through, decoupled from any
/// particular transport. The gateway's WS connection implements this; tests
/// can implement it with a plain `Vec`-backed recorder.
pub trait OutboundSink: Send + Sync {
    fn send(&self, frame: OutboundTerminalFrame);
    fn is_open(&self) -> bool;
}

/// Session lifecycle states. `Initializing` exists only conceptually
/// between a successful `PtyHandle::spawn` and the `Session` object coming
/// into being — by the time a `Session` exists it is already `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Exiting,
    Destroyed,
}

struct Inner {
    lifecycle: Lifecycle,
    pty: PtyHandle,
    replay: ReplayBuffer,
    sanitizer: SanitizerFilter,
    conns: HashMap<ConnId, Arc<dyn OutboundSink>>,
    config: SpawnConfig,
}

/// One PTY, its replay buffer, and its attached clients.
pub struct Session {
    pub id: SessionId,
    pid: i32,
    mode: SpawnMode,
    created_at: u64,
    inner: Mutex<Inner>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        mode: SpawnMode,
        config: SpawnConfig,
        pty: PtyHandle,
        replay_capacity: usize,
    ) -> Self {
        let pid = pty.pid();
        Self {
            id,
            pid,
            mode,
            created_at: now_unix(),
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::Running,
                pty,
                replay: ReplayBuffer::new(replay_capacity),
                sanitizer: SanitizerFilter::new(),
                conns: HashMap::new(),
                config,
            }),
        }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Add `conn` to the attached set. Idempotent — attaching an already
    /// attached conn just replaces its sink with itself.
    pub async fn attach(&self, conn_id: ConnId, conn: Arc<dyn OutboundSink>) {
        let mut inner = self.inner.lock().await;
        inner.conns.insert(conn_id, conn);
    }

    /// Attach `conn` and read the replay snapshot as one atomic operation —
    /// a single lock acquisition spanning both the conns-insert and the
    /// buffer read. `on_data` takes the same lock to append to the buffer
    /// and fan out a live `output` frame, so holding it across both steps
    /// here is what guarantees a `replay` caller's snapshot reflects the
    /// buffer state at attach time and excludes anything `on_data` appends
    /// afterward — the ordering guarantee `replay` depends on (the snapshot
    /// is delivered before any subsequent live `output` frame the conn
    /// observes after attach). Calling `attach` and `replay_snapshot`
    /// separately would let `on_data` run between them and double-deliver
    /// the same bytes, once live and once in the snapshot.
    pub async fn attach_and_snapshot(&self, conn_id: ConnId, conn: Arc<dyn OutboundSink>) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().await;
        inner.conns.insert(conn_id, conn);
        if inner.lifecycle == Lifecycle::Destroyed {
            return None;
        }
        Some(inner.replay.snapshot())
    }

    /// Remove `conn_id` from the attached set. Idempotent.
    pub async fn detach(&self, conn_id: &ConnId) {
        let mut inner = self.inner.lock().await;
        inner.conns.remove(conn_id);
    }

    /// Forward raw input bytes to the PTY, unmodified. A no-op once the
    /// session has left `Running`.
    pub async fn input(&self, data: &[u8]) -> Result<()> {
        let inner = self.inner.lock().await;
        if inner.lifecycle != Lifecycle::Running {
            return Ok(());
        }
        inner.pty.write(data)
    }

    /// Resize the PTY and persist the new dimensions. A no-op once the
    /// session has left `Running`.
    pub async fn resize(&self, cols: u32, rows: u32) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.lifecycle != Lifecycle::Running {
            return Ok(());
        }
        inner.pty.resize(cols, rows)?;
        inner.config.cols = cols;
        inner.config.rows = rows;
        Ok(())
    }

    /// Deliver a signal to the PTY's child. A no-op once the session has
    /// left `Running`.
    pub async fn kill(&self, sig: Signal) -> Result<()> {
        let inner = self.inner.lock().await;
        if inner.lifecycle != Lifecycle::Running {
            return Ok(());
        }
        inner.pty.signal(sig)
    }

    /// Current replay buffer contents, or `None` once the session is
    /// `Destroyed` (the buffer is cleared at that point).
    pub async fn replay_snapshot(&self) -> Option<Vec<u8>> {
        let inner = self.inner.lock().await;
        if inner.lifecycle == Lifecycle::Destroyed {
            return None;
        }
        Some(inner.replay.snapshot())
    }

    pub async fn info(&self) -> SessionInfo {
        let inner = self.inner.lock().await;
        SessionInfo {
            id: self.id.clone(),
            mode: self.mode,
            shell: inner.config.shell.clone(),
            cwd: inner.config.cwd.clone(),
            cols: inner.config.cols,
            rows: inner.config.rows,
            created_at: self.created_at,
            is_alive: inner.lifecycle == Lifecycle::Running,
        }
    }

    /// PTY data handler: sanitize, buffer, then fan out to every
    /// attached conn that is currently open. Called from the session's
    /// dedicated driver task — never concurrently with itself.
    pub(crate) async fn on_data(&self, raw: &[u8]) {
        let mut inner = self.inner.lock().await;
        let sanitized = inner.sanitizer.sanitize(raw);
        if sanitized.is_empty() {
            return;
        }
        inner.replay.append(&sanitized);
        let data = String::from_utf8_lossy(&sanitized).into_owned();
        let frame = OutboundTerminalFrame::Output { session_id: self.id.to_string(), data };
        for conn in inner.conns.values() {
            if conn.is_open() {
                conn.send(frame.clone());
            }
        }
    }

    /// PTY exit handler: move to `Exiting`, broadcast exactly one
    /// `exit` frame to every attached conn. Destruction (and registry
    /// removal) happens separately after the grace window elapses.
    pub(crate) async fn on_exit(&self, code: i32, signal: Option<i32>) {
        let mut inner = self.inner.lock().await;
        inner.lifecycle = Lifecycle::Exiting;
        let frame = OutboundTerminalFrame::Exit { session_id: self.id.to_string(), exit_code: code, signal };
        for conn in inner.conns.values() {
            if conn.is_open() {
                conn.send(frame.clone());
            }
        }
    }

    /// Final lifecycle transition, called by the registry once the grace
    /// window after `on_exit` has elapsed.
    pub(crate) async fn mark_destroyed(&self) {
        let mut inner = self.inner.lock().await;
        inner.lifecycle = Lifecycle::Destroyed;
        inner.replay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpawnConfig;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    struct RecordingSink {
        frames: StdMutex<Vec<OutboundTerminalFrame>>,
        open: std::sync::atomic::AtomicBool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self { frames: StdMutex::new(Vec::new()), open: std::sync::atomic::AtomicBool::new(true) })
        }
    }

    impl OutboundSink for RecordingSink {
        fn send(&self, frame: OutboundTerminalFrame) {
            self.frames.lock().unwrap().push(frame);
        }
        fn is_open(&self) -> bool {
            self.open.load(std::sync::atomic::Ordering::Acquire)
        }
    }

    fn test_config() -> SpawnConfig {
        SpawnConfig { shell: "/bin/sh".into(), cwd: "/tmp".into(), cols: 80, rows: 24, env: StdHashMap::new() }
    }

    #[tokio::test]
    async fn on_data_sanitizes_buffers_and_fans_out() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        let sink = RecordingSink::new();
        session.attach(ConnId::new(), sink.clone()).await;

        session.on_data(b"before\x1bPsecret\x1b\\after").await;

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            OutboundTerminalFrame::Output { data, .. } => {
                assert_eq!(data, "before[DCS blocked]after");
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        let snapshot = session.replay_snapshot().await.unwrap();
        assert_eq!(snapshot, b"before[DCS blocked]after".to_vec());
    }

    #[tokio::test]
    async fn attach_and_snapshot_does_not_duplicate_with_on_data() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        // Prior history a reattaching client should catch up on exactly once.
        session.on_data(b"hello ").await;

        let sink = RecordingSink::new();
        let conn_id = ConnId::new();
        let snapshot = session.attach_and_snapshot(conn_id, sink.clone()).await.unwrap();
        assert_eq!(snapshot, b"hello ".to_vec());

        // Output that arrives after attach must show up live, not in the
        // snapshot already returned above.
        session.on_data(b"world").await;
        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            OutboundTerminalFrame::Output { data, .. } => assert_eq!(data, "world"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_is_idempotent() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        let sink = RecordingSink::new();
        let conn_id = ConnId::new();
        session.attach(conn_id.clone(), sink.clone()).await;
        session.attach(conn_id.clone(), sink.clone()).await;

        session.on_data(b"hi").await;
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exiting_session_rejects_mutation_but_still_replays() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        session.on_data(b"hello").await;
        session.on_exit(0, None).await;

        // input/resize/kill are no-ops, not errors, while Exiting.
        assert!(session.input(b"x").await.is_ok());
        assert!(session.resize(100, 30).await.is_ok());

        let snapshot = session.replay_snapshot().await;
        assert_eq!(snapshot, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn destroyed_session_has_no_replay() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        session.on_data(b"hello").await;
        session.on_exit(0, None).await;
        session.mark_destroyed().await;

        assert_eq!(session.replay_snapshot().await, None);
    }

    #[tokio::test]
    async fn exit_emits_exactly_one_exit_frame_per_attached_conn() {
        let (pty, _events) = PtyHandle::spawn(&test_config()).expect("spawn");
        let session = Session::new(SessionId::from("s1"), SpawnMode::Shell, test_config(), pty, 1024);

        let sink_a = RecordingSink::new();
        let sink_b = RecordingSink::new();
        session.attach(ConnId::new(), sink_a.clone()).await;
        session.attach(ConnId::new(), sink_b.clone()).await;

        session.on_exit(7, None).await;

        for sink in [&sink_a, &sink_b] {
            let frames = sink.frames.lock().unwrap();
            assert_eq!(frames.len(), 1);
            assert!(matches!(frames[0], OutboundTerminalFrame::Exit { exit_code: 7, .. }));
        }
    }
}
