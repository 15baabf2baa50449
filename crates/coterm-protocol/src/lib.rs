//! coterm-protocol — wire frame schema and classification for the terminal
//! multiplexer transport.

pub mod frames;
pub mod router;

pub use frames::{InboundTerminalFrame, OutboundTerminalFrame, RawFrame, SpawnConfigWire, SpawnMode};
pub use router::{classify, FrameClass};
