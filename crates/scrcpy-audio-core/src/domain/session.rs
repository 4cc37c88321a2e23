//! Session supervisor states and the live mirror session descriptor.
//!
//! # State machine
//!
//! ```text
//!            bridge ok            mirror started
//! Idle ──► Connecting ──► Connected ──────────► Active
//!  ▲           │                                   │
//!  │           │ bridge failed                     │ close / interrupt
//!  │◄──────────┘                                   ▼
//!  └────────────────────────────────────────── Disconnecting
//! ```
//!
//! Every state may move to `Disconnecting` on a user close or an external
//! interrupt.  A completed connect attempt always ends in `Active` or `Idle`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::buffer::BufferSetting;
use super::endpoint::Endpoint;

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No bridge link in flight and no mirror process.
    #[default]
    Idle,
    /// `adb connect` is running.
    Connecting,
    /// Bridge link affirmed; the mirror process is being started.
    Connected,
    /// The mirror process is live.
    Active,
    /// Teardown in flight.
    Disconnecting,
}

impl SessionState {
    /// Returns `true` for the two states a finished operation may leave behind.
    pub fn is_settled(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Active => "active",
            SessionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// What the supervisor knows about the one live mirror process.
///
/// The OS process handle itself stays inside the mirror process owner; this
/// descriptor is the shareable view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSession {
    pub endpoint: Endpoint,
    pub buffer: BufferSetting,
    pub pid: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn test_only_idle_and_active_are_settled() {
        assert!(SessionState::Idle.is_settled());
        assert!(SessionState::Active.is_settled());
        assert!(!SessionState::Connecting.is_settled());
        assert!(!SessionState::Connected.is_settled());
        assert!(!SessionState::Disconnecting.is_settled());
    }
}
