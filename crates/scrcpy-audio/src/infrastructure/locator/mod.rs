//! Executable discovery for `adb` and `scrcpy`.
//!
//! Each tool is resolved independently, first match wins:
//!
//! 1. An explicit path (CLI flag, environment variable, or config file).
//! 2. The configured tools folder: the folder itself, then its immediate
//!    subfolders in name order (release archives unpack into a versioned
//!    subfolder such as `scrcpy-linux-x86_64-v3.1/`).
//! 3. The executable search path.
//!
//! Resolution happens once at startup.  The resulting [`ToolPaths`] is passed
//! to the adapters explicitly; nothing here is cached globally.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const BRIDGE_TOOL_NAME: &str = "adb";
pub const MIRROR_TOOL_NAME: &str = "scrcpy";

/// Where a tool path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Explicit,
    ToolsDir,
    SearchPath,
    /// Nothing found; the bare program name is used and spawning it will
    /// report the tool as missing.
    Unresolved,
}

/// A resolved executable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub path: PathBuf,
    pub source: ToolSource,
}

impl ResolvedTool {
    pub fn is_found(&self) -> bool {
        self.source != ToolSource::Unresolved
    }
}

impl fmt::Display for ResolvedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_found() {
            write!(f, "{}", self.path.display())
        } else {
            f.write_str("not found")
        }
    }
}

/// Resolved paths of both external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub bridge: ResolvedTool,
    pub mirror: ResolvedTool,
}

impl fmt::Display for ToolPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adb: {}  |  scrcpy: {}", self.bridge, self.mirror)
    }
}

/// Builder-style resolver for [`ToolPaths`].
#[derive(Debug, Clone, Default)]
pub struct BinaryLocator {
    bridge_path: Option<PathBuf>,
    mirror_path: Option<PathBuf>,
    tools_dir: Option<PathBuf>,
    search_path: bool,
}

impl BinaryLocator {
    /// A locator that falls back to the executable search path.
    pub fn new() -> Self {
        Self {
            search_path: true,
            ..Self::default()
        }
    }

    pub fn with_bridge_path(mut self, path: Option<PathBuf>) -> Self {
        self.bridge_path = path;
        self
    }

    pub fn with_mirror_path(mut self, path: Option<PathBuf>) -> Self {
        self.mirror_path = path;
        self
    }

    pub fn with_tools_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tools_dir = dir;
        self
    }

    /// Disables the search-path fallback.
    pub fn without_search_path(mut self) -> Self {
        self.search_path = false;
        self
    }

    pub fn locate(&self) -> ToolPaths {
        ToolPaths {
            bridge: self.resolve(BRIDGE_TOOL_NAME, self.bridge_path.as_deref()),
            mirror: self.resolve(MIRROR_TOOL_NAME, self.mirror_path.as_deref()),
        }
    }

    fn resolve(&self, name: &str, explicit: Option<&Path>) -> ResolvedTool {
        if let Some(path) = explicit {
            return ResolvedTool {
                path: path.to_path_buf(),
                source: ToolSource::Explicit,
            };
        }

        if let Some(path) = self.tools_dir.as_deref().and_then(|dir| scan_dir(dir, name)) {
            debug!(tool = name, path = %path.display(), "found in tools folder");
            return ResolvedTool {
                path,
                source: ToolSource::ToolsDir,
            };
        }

        if self.search_path {
            if let Ok(path) = which::which(name) {
                return ResolvedTool {
                    path,
                    source: ToolSource::SearchPath,
                };
            }
        }

        debug!(tool = name, "not found");
        ResolvedTool {
            path: PathBuf::from(name),
            source: ToolSource::Unresolved,
        }
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Looks for `name` directly in `dir`, then one level down.
fn scan_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let file_name = executable_name(name);

    let direct = dir.join(&file_name);
    if direct.is_file() {
        return Some(direct);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .map(|sub| sub.join(&file_name))
        .find(|candidate| candidate.is_file())
}
