//! # scrcpy-audio-core
//!
//! Shared library for Scrcpy-Audio containing the domain values, the
//! command-line "protocol" spoken to the two external tools, and the status
//! taxonomy surfaced to the presentation layer.
//!
//! This crate has zero dependencies on OS APIs, subprocesses, or the file
//! system.  Everything here can be unit-tested without `adb` or `scrcpy`
//! installed.
//!
//! # Architecture overview
//!
//! Scrcpy-Audio mirrors the audio output of an Android device to the desktop.
//! It does not decode audio itself; it orchestrates two external tools:
//!
//! - **`adb`** (the device bridge) opens a TCP link to the device's debug
//!   daemon (`adb connect host:port`).
//! - **`scrcpy`** (the mirroring client) streams the device's playback audio
//!   once the link is up (`scrcpy --no-window --no-video ...`).
//!
//! This crate defines:
//!
//! - **`domain`** – `Endpoint`, `BufferSetting`, `AudioBitRate`, and the
//!   supervisor's `SessionState` machine states.
//! - **`protocol`** – how directives are rendered into tool arguments, and how
//!   the bridge tool's free-form text output is classified.
//! - **`status`** – the outcome classification every operation reports.

pub mod domain;
pub mod protocol;
pub mod status;

pub use domain::buffer::{AudioBitRate, BufferSetting, SettingError, DEFAULT_BUFFER_MS};
pub use domain::endpoint::{Endpoint, EndpointError, DEFAULT_BRIDGE_PORT};
pub use domain::session::{MirrorSession, SessionState};
pub use protocol::bridge::{BridgeCommand, BridgeCommandResult};
pub use protocol::mirror::MirrorArgs;
pub use status::StatusKind;
