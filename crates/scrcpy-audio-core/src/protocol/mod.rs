//! Command-line protocol spoken to the external tools.
//!
//! Neither tool exposes a machine-readable status channel, so the "protocol"
//! is argument vectors going in and exit code plus free-form text coming out.

pub mod bridge;
pub mod mirror;

pub use bridge::{BridgeCommand, BridgeCommandResult};
pub use mirror::MirrorArgs;
