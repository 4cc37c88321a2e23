//! Spawn plumbing shared by the `adb` and `scrcpy` adapters.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::application::ports::ToolError;

/// `CREATE_NO_WINDOW`: keeps console tools from flashing a terminal window.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// A command for `program` with stdin closed and kill-on-drop set.
pub(crate) fn tool_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

/// Maps an `io::Error` from spawning `program` onto the tool error taxonomy.
pub(crate) fn spawn_error(tool: &'static str, program: &Path, err: io::Error) -> ToolError {
    if err.kind() == io::ErrorKind::NotFound {
        ToolError::NotFound {
            tool,
            program: program.display().to_string(),
        }
    } else {
        ToolError::Spawn {
            tool,
            message: err.to_string(),
        }
    }
}

/// Throw-away executables for subprocess tests.
#[cfg(all(test, unix))]
pub(crate) mod fake {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// A fresh, uniquely named directory under the system temp dir.
    pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    /// Writes an executable `/bin/sh` script named `name` into `dir`.
    pub(crate) fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_tool_not_found() {
        let err = spawn_error(
            "adb",
            Path::new("/opt/tools/adb"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert_eq!(
            err,
            ToolError::NotFound {
                tool: "adb",
                program: "/opt/tools/adb".to_string()
            }
        );
    }

    #[test]
    fn test_other_errors_map_to_spawn_error() {
        let err = spawn_error(
            "scrcpy",
            Path::new("scrcpy"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, ToolError::Spawn { tool: "scrcpy", .. }));
    }
}
