//! Wire frame schema for the terminal multiplexer protocol.
//!
//! Every frame is a JSON object with a string `type` discriminator. Terminal
//! frames additionally carry a `sessionId`. Inbound and outbound frames are
//! modelled as separate tagged enums rather than a generic req/res envelope,
//! since every terminal frame here is either a command or a push — there is
//! no req/res correlation id in this protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inbound terminal frames, keyed by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundTerminalFrame {
    #[serde(rename = "terminal:spawn")]
    Spawn {
        #[serde(rename = "sessionId")]
        session_id: String,
        mode: SpawnMode,
        config: SpawnConfigWire,
    },
    #[serde(rename = "terminal:input")]
    Input {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: String,
    },
    #[serde(rename = "terminal:resize")]
    Resize {
        #[serde(rename = "sessionId")]
        session_id: String,
        cols: u32,
        rows: u32,
    },
    #[serde(rename = "terminal:kill")]
    Kill {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(default)]
        signal: Option<String>,
    },
    #[serde(rename = "terminal:replay")]
    Replay {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

impl InboundTerminalFrame {
    pub fn session_id(&self) -> &str {
        match self {
            InboundTerminalFrame::Spawn { session_id, .. }
            | InboundTerminalFrame::Input { session_id, .. }
            | InboundTerminalFrame::Resize { session_id, .. }
            | InboundTerminalFrame::Kill { session_id, .. }
            | InboundTerminalFrame::Replay { session_id, .. } => session_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnMode {
    Shell,
    AgentTool,
}

/// Spawn configuration as it arrives on the wire (pre-validation).
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnConfigWire {
    pub shell: String,
    pub cwd: String,
    #[serde(default)]
    pub cols: Option<u32>,
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Outbound terminal frames, keyed by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundTerminalFrame {
    #[serde(rename = "terminal:spawned")]
    Spawned {
        #[serde(rename = "sessionId")]
        session_id: String,
        pid: i32,
    },
    #[serde(rename = "terminal:output")]
    Output {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: String,
    },
    #[serde(rename = "terminal:exit")]
    Exit {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },
    #[serde(rename = "terminal:error")]
    Error {
        #[serde(rename = "sessionId")]
        session_id: String,
        error: String,
    },
    #[serde(rename = "terminal:replay-data")]
    ReplayData {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: String,
    },
}

/// A minimal raw frame used only to read the `type` tag during routing,
/// before the body is reinterpreted as a concrete inbound variant.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
}
