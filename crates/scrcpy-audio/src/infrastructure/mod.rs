//! Infrastructure layer for Scrcpy-Audio.
//!
//! Contains the OS-facing adapters: the `adb` and `scrcpy` subprocess
//! wrappers, executable discovery, TOML settings persistence, and the command
//! bridge the presentation talks to.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `scrcpy_audio_core`, but MUST NOT be imported by either of them.

pub mod bridge;
pub mod locator;
pub mod mirror;
mod process;
pub mod storage;
pub mod ui_bridge;
