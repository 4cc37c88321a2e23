//! `adb` adapter: runs one bridge directive per call.
//!
//! Each call spawns `adb <args>`, waits for it to exit, and captures stdout
//! and stderr.  `adb` reports some failures on stdout and some successes on
//! stderr, so both streams are combined into one trimmed text that the core
//! classifier inspects.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scrcpy_audio_core::{BridgeCommand, BridgeCommandResult};
use tracing::debug;

use crate::application::ports::{BridgeTool, ToolError};
use crate::infrastructure::process::{spawn_error, tool_command};

/// Exit code recorded when the OS reports no code (killed by a signal).
const NO_EXIT_CODE: i32 = -1;

/// [`BridgeTool`] backed by the real `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbBridgeClient {
    program: PathBuf,
}

impl AdbBridgeClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl BridgeTool for AdbBridgeClient {
    async fn run(&self, command: &BridgeCommand) -> Result<BridgeCommandResult, ToolError> {
        let args = command.args();
        debug!(program = %self.program.display(), ?args, "running adb");

        let output = tool_command(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| spawn_error("adb", &self.program, e))?;

        let exit_code = output.status.code().unwrap_or(NO_EXIT_CODE);
        let text = combine_output(&output.stdout, &output.stderr);
        debug!(exit_code, output = %text, "adb {} finished", command.verb());
        Ok(BridgeCommandResult::new(exit_code, text))
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim(), stderr.trim()) {
        ("", err) => err.to_string(),
        (out, "") => out.to_string(),
        (out, err) => format!("{out}\n{err}"),
    }
}
