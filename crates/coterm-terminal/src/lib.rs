//! coterm-terminal — PTY session lifecycle, output sanitization, and the
//! server-side state machine for the `terminal:*` wire protocol.
//!
//! Three layers compose into "spawn a shell, stream its output to N clients,
//! keep enough history to replay on reattach":
//!
//! - [`pty`] spawns a child behind a pseudo-terminal and turns its blocking
//!   I/O into an async event stream (`PtyHandle` + `PtyEventStream`).
//! - [`sanitizer`] and [`replay`] sit on that stream: every chunk is
//!   sanitized once, then kept in a bounded FIFO ring so a reattaching
//!   client can catch up.
//! - [`session`] and [`registry`] own the PTY, the buffer, and the attached
//!   client set per session id, plus the process-wide table of sessions.
//!
//! [`protocol`] is the seam gateway code calls into: it maps inbound
//! `terminal:*` frames onto the above and emits the matching outbound
//! frames.

pub mod error;
pub mod protocol;
pub mod pty;
pub mod registry;
pub mod replay;
pub mod sanitizer;
pub mod session;
pub mod shell_allowlist;
pub mod types;

pub use error::{Result, TerminalError};
pub use registry::SessionRegistry;
pub use session::{OutboundSink, Session};
pub use types::{ConnId, SessionId, SessionInfo, Signal, SpawnConfig};
