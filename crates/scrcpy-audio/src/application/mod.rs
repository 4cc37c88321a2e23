//! Application layer for Scrcpy-Audio.
//!
//! Use cases in this layer orchestrate domain values from `scrcpy-audio-core`
//! and talk to the outside world only through the traits in [`ports`].  No
//! subprocess is spawned and no file is touched here; the infrastructure
//! layer supplies implementations at construction time, and tests supply
//! recording doubles.
//!
//! # Sub-modules
//!
//! - **`ports`** – The `BridgeTool`, `MirrorControl` and `ConfigStore` traits
//!   plus the error types their implementations report.
//!
//! - **`events`** – Log lines, state changes and control toggles flowing back
//!   to the presentation layer.
//!
//! - **`supervisor`** – The `SessionSupervisor` state machine: single-flight
//!   connect, ordered best-effort teardown, at most one mirror process.

pub mod events;
pub mod ports;
pub mod supervisor;
