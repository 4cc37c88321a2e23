//! Bridge tool (`adb`) directives and result classification.
//!
//! # Output classification
//!
//! `adb` reports the outcome of `connect` as human-readable text, and a
//! refused connection may still exit with status `0`.  The only contract
//! available is therefore:
//!
//! ```text
//! affirmative  <=>  exit_code == 0  AND  lowercase(output) contains "connected" or "already"
//! ```
//!
//! Typical outputs:
//!
//! | exit | output                                         | affirmative |
//! |------|------------------------------------------------|-------------|
//! | 0    | `connected to 192.168.1.10:5555`               | yes         |
//! | 0    | `already connected to 192.168.1.10:5555`       | yes         |
//! | 1    | `failed to connect to 192.168.1.10:5555`       | no          |
//! | 0    | `cannot connect to 192.168.1.10:5555: refused` | no          |

use serde::{Deserialize, Serialize};

use crate::domain::endpoint::Endpoint;

/// Exit code recorded when the bridge executable cannot be found.
///
/// Mirrors the shell convention so it never collides with a code `adb`
/// itself reports.
pub const TOOL_NOT_FOUND_EXIT_CODE: i32 = 127;

/// Exit code recorded when the OS refused to start the bridge executable.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

const AFFIRMATIVE_MARKER: &str = "connected";
const IDEMPOTENT_MARKER: &str = "already";
const PAIRED_MARKER: &str = "successfully paired";

/// One invocation of the bridge tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// `connect host:port`
    Connect(Endpoint),
    /// `disconnect host:port`
    Disconnect(Endpoint),
    /// `tcpip <port>`: switch a USB-attached device to network listening mode.
    TcpIp(u16),
    /// `pair host:port <code>`: forward a wireless-debugging pairing code.
    Pair { endpoint: Endpoint, code: String },
}

impl BridgeCommand {
    /// Returns the directive name, used as the log prefix (`[adb connect]`).
    pub fn verb(&self) -> &'static str {
        match self {
            BridgeCommand::Connect(_) => "connect",
            BridgeCommand::Disconnect(_) => "disconnect",
            BridgeCommand::TcpIp(_) => "tcpip",
            BridgeCommand::Pair { .. } => "pair",
        }
    }

    /// Renders the argument vector passed after the executable path.
    pub fn args(&self) -> Vec<String> {
        let verb = self.verb().to_string();
        match self {
            BridgeCommand::Connect(ep) | BridgeCommand::Disconnect(ep) => {
                vec![verb, ep.to_string()]
            }
            BridgeCommand::TcpIp(port) => vec![verb, port.to_string()],
            BridgeCommand::Pair { endpoint, code } => {
                vec![verb, endpoint.to_string(), code.clone()]
            }
        }
    }
}

/// Exit code and combined stdout/stderr text of one bridge invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCommandResult {
    pub exit_code: i32,
    pub output_text: String,
}

impl BridgeCommandResult {
    pub fn new(exit_code: i32, output_text: impl Into<String>) -> Self {
        Self {
            exit_code,
            output_text: output_text.into(),
        }
    }

    /// `true` when the process exited with status `0`.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Classifies the result of a `connect` directive.
    pub fn is_connect_affirmative(&self) -> bool {
        if !self.succeeded() {
            return false;
        }
        let text = self.output_text.to_lowercase();
        text.contains(AFFIRMATIVE_MARKER) || text.contains(IDEMPOTENT_MARKER)
    }

    /// Classifies the result of a `pair` directive.
    pub fn is_pair_affirmative(&self) -> bool {
        self.succeeded() && self.output_text.to_lowercase().contains(PAIRED_MARKER)
    }

    /// One-line rendering for log output: `exit=<code>. <text>`.
    pub fn summary(&self) -> String {
        if self.output_text.is_empty() {
            format!("exit={}.", self.exit_code)
        } else {
            format!("exit={}. {}", self.exit_code, self.output_text)
        }
    }
}
