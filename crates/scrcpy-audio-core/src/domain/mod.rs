//! Domain entities for Scrcpy-Audio.
//!
//! Pure values with no infrastructure dependencies.  Validation lives here so
//! that every invalid form input is rejected before any subprocess is spawned.

/// Audio buffer and bit-rate settings passed to the mirroring tool.
pub mod buffer;

/// The `host:port` pair identifying the device's bridge listener.
pub mod endpoint;

/// Supervisor states and the live mirror session descriptor.
pub mod session;
