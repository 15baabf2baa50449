//! Shared data types for coterm-terminal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque identifier for a session. The wire protocol lets the client choose
/// this string directly (`sessionId` on `terminal:spawn`), so unlike most
/// identifiers in this workspace it is not generated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque identifier for an attached client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SpawnMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnMode {
    Shell,
    AgentTool,
}

impl From<coterm_protocol::frames::SpawnMode> for SpawnMode {
    fn from(wire: coterm_protocol::frames::SpawnMode) -> Self {
        match wire {
            coterm_protocol::frames::SpawnMode::Shell => SpawnMode::Shell,
            coterm_protocol::frames::SpawnMode::AgentTool => SpawnMode::AgentTool,
        }
    }
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// The permitted POSIX signal set a `terminal:kill` frame may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
    Int,
    Hup,
}

impl Signal {
    /// Parse a wire-format signal name (`"SIGTERM"`, etc). Returns `None`
    /// for anything outside the permitted set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SIGTERM" => Some(Signal::Term),
            "SIGKILL" => Some(Signal::Kill),
            "SIGINT" => Some(Signal::Int),
            "SIGHUP" => Some(Signal::Hup),
            _ => None,
        }
    }

    pub fn as_libc(self) -> libc::c_int {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
            Signal::Int => libc::SIGINT,
            Signal::Hup => libc::SIGHUP,
        }
    }
}

// ---------------------------------------------------------------------------
// SpawnConfig
// ---------------------------------------------------------------------------

pub const MIN_DIM: u32 = 1;
pub const MAX_DIM: u32 = 1000;
pub const DEFAULT_COLS: u32 = 80;
pub const DEFAULT_ROWS: u32 = 24;

/// Validated spawn configuration. Unlike the wire-level `SpawnConfigWire`,
/// the shell path here has already been through the allow-list and the
/// dimensions have already been defaulted/clamped.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub shell: String,
    pub cwd: String,
    pub cols: u32,
    pub rows: u32,
    pub env: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// Read-only snapshot of a session's metadata, used for operational
/// introspection (e.g. the gateway's `/health` endpoint). Not itself part of
/// the wire protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub mode: SpawnMode,
    pub shell: String,
    pub cwd: String,
    pub cols: u32,
    pub rows: u32,
    pub created_at: u64,
    pub is_alive: bool,
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
