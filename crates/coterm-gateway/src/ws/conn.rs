//! `ClientConn`: the transport-level half of an attached client.
//!
//! Deliberately has no notion of sessions — it only appears to `Session`
//! through the `OutboundSink` trait. State is a single `open` flag rather
//! than a full `{open, closing, closed}` enumeration, since "closing" and
//! "closed" are indistinguishable from a sender's point of view: both mean
//! "stop sending".

use axum::extract::ws::Message;
use coterm_protocol::frames::OutboundTerminalFrame;
use coterm_terminal::{ConnId, OutboundSink};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::warn;

pub struct ClientConn {
    id: ConnId,
    tx: mpsc::Sender<Message>,
    open: AtomicBool,
}

impl ClientConn {
    pub fn new(id: ConnId, tx: mpsc::Sender<Message>) -> Self {
        Self { id, tx, open: AtomicBool::new(true) }
    }

    /// Mark the conn closed. Idempotent; called once the connection task
    /// observes the socket going away.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl OutboundSink for ClientConn {
    /// A saturated outbound queue drops the frame rather than blocking, so
    /// one slow client never stalls the PTY data path or any other attached
    /// conn. A dropped live `output` frame is recoverable on reconnect via
    /// `terminal:replay`.
    fn send(&self, frame: OutboundTerminalFrame) {
        if !self.open.load(Ordering::Acquire) {
            return;
        }
        let json = serde_json::to_string(&frame).unwrap_or_default();
        match self.tx.try_send(Message::Text(json.into())) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "outbound queue saturated, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.open.store(false, Ordering::Release);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
