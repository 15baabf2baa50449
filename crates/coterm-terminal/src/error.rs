//! Error types for the coterm-terminal crate.

use thiserror::Error;

/// All errors that can originate from terminal operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// PTY allocation or child-process spawn failed. No session is put in
    /// the registry when this occurs.
    #[error("PTY spawn error: {0}")]
    PtySpawn(String),

    /// The requested session id does not exist in the registry.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// `spawn` was called with an id already present in the registry.
    #[error("Duplicate session: {0}")]
    DuplicateSession(String),

    /// The requested signal is not on the permitted set {TERM, KILL, INT, HUP}.
    #[error("Signal not permitted: {0}")]
    SignalNotPermitted(String),

    /// `resize` was called with cols/rows outside the permitted [1, 1000] range.
    #[error("Resize out of range: cols={cols}, rows={rows}")]
    ResizeOutOfRange { cols: u32, rows: u32 },

    /// Underlying I/O failure (read, write, flush).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TerminalError>;
