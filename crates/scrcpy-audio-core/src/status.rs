//! Outcome classification surfaced to the presentation layer.
//!
//! Every supervisor operation ends in exactly one [`StatusKind`].  The CLI
//! maps each kind to a distinct process exit code so scripts wrapping the
//! binary can tell failures apart without parsing log text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified result of a supervisor operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    /// Empty host, bad port, non-numeric buffer, bad bit rate.
    InvalidInput,
    /// The bridge tool ran but did not affirm the connection.
    BridgeFailure,
    /// Another connect or teardown sequence is in flight.
    Busy,
    /// Neither terminate nor kill ended the mirror process.
    TeardownError,
    /// The OS refused to start a tool.
    SpawnError,
    /// A tool executable could not be found.
    ToolNotFound,
}

impl StatusKind {
    /// Process exit code used by the command-line front end.
    pub fn exit_code(self) -> u8 {
        match self {
            StatusKind::Success => 0,
            StatusKind::InvalidInput => 2,
            StatusKind::BridgeFailure => 3,
            StatusKind::Busy => 4,
            StatusKind::TeardownError => 5,
            StatusKind::SpawnError => 126,
            StatusKind::ToolNotFound => 127,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Success => "success",
            StatusKind::InvalidInput => "invalid_input",
            StatusKind::BridgeFailure => "bridge_failure",
            StatusKind::Busy => "busy",
            StatusKind::TeardownError => "teardown_error",
            StatusKind::SpawnError => "spawn_error",
            StatusKind::ToolNotFound => "tool_not_found",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_are_distinct() {
        let all = [
            StatusKind::Success,
            StatusKind::InvalidInput,
            StatusKind::BridgeFailure,
            StatusKind::Busy,
            StatusKind::TeardownError,
            StatusKind::SpawnError,
            StatusKind::ToolNotFound,
        ];
        let codes: HashSet<u8> = all.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_only_success_exits_zero() {
        assert_eq!(StatusKind::Success.exit_code(), 0);
        assert_eq!(StatusKind::ToolNotFound.exit_code(), 127);
    }
}
