//! Process-wide configuration: `coterm.toml` + `COTERM_*` env overrides.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 7890;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default ReplayBuffer capacity in bytes (64 KiB).
pub const DEFAULT_REPLAY_CAPACITY_BYTES: usize = 64 * 1024;

/// Grace window between a PTY exit event and the session's removal from the
/// registry, so in-flight `exit` frame deliveries to attached conns complete.
pub const DEFAULT_EXIT_GRACE_MS: u64 = 100;

/// Maximum size of a single inbound WS text frame before it is dropped.
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Capacity of a single client connection's outbound queue. Once full,
/// further frames to that connection are dropped rather than applying
/// backpressure to the PTY data path.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 128;

/// Top-level config (`coterm.toml` + `COTERM_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotermConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Default for CotermConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
            },
            terminal: TerminalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default = "default_replay_capacity")]
    pub replay_capacity_bytes: usize,
    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            replay_capacity_bytes: DEFAULT_REPLAY_CAPACITY_BYTES,
            exit_grace_ms: DEFAULT_EXIT_GRACE_MS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_replay_capacity() -> usize {
    DEFAULT_REPLAY_CAPACITY_BYTES
}
fn default_exit_grace_ms() -> u64 {
    DEFAULT_EXIT_GRACE_MS
}

impl CotermConfig {
    /// Load config from a TOML file with `COTERM_*` env var overrides.
    ///
    /// Checks, in order: explicit path argument, then `~/.coterm/coterm.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CotermConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("COTERM_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.coterm/coterm.toml", home)
}
