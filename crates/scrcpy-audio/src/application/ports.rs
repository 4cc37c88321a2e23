//! Ports: the traits through which the supervisor reaches the outside world.
//!
//! Infrastructure implementations spawn real `adb` / `scrcpy` processes and
//! write TOML files; test implementations record calls.

use std::time::Duration;

use async_trait::async_trait;
use scrcpy_audio_core::{
    protocol::bridge::{SPAWN_FAILURE_EXIT_CODE, TOOL_NOT_FOUND_EXIT_CODE},
    BridgeCommand, BridgeCommandResult, BufferSetting, Endpoint, SettingError, StatusKind,
};
use thiserror::Error;

/// Grace period between the terminate request and the forceful kill.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Failure to run an external tool at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The executable does not exist at the resolved path or on `PATH`.
    #[error("{tool} not found: {program}")]
    NotFound { tool: &'static str, program: String },

    /// The OS refused to start the executable.
    #[error("failed to start {tool}: {message}")]
    Spawn { tool: &'static str, message: String },
}

impl ToolError {
    /// Sentinel exit code for log lines, distinct from tool-reported codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::NotFound { .. } => TOOL_NOT_FOUND_EXIT_CODE,
            ToolError::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
        }
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            ToolError::NotFound { .. } => StatusKind::ToolNotFound,
            ToolError::Spawn { .. } => StatusKind::SpawnError,
        }
    }
}

/// Failure to start the mirroring process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorStartError {
    #[error("invalid audio buffer: {0}")]
    InvalidBuffer(#[from] SettingError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl MirrorStartError {
    pub fn kind(&self) -> StatusKind {
        match self {
            MirrorStartError::InvalidBuffer(_) => StatusKind::InvalidInput,
            MirrorStartError::Tool(e) => e.kind(),
        }
    }
}

/// How a stop request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// No process was live; nothing was done.
    NotRunning,
    /// The process had already exited on its own and was reaped.
    AlreadyExited { pid: u32, code: Option<i32> },
    /// The process exited after the graceful terminate request.
    Terminated { pid: u32 },
    /// The process ignored the terminate request and was killed.
    Killed { pid: u32 },
}

/// Both the terminate and the kill attempt failed.
///
/// The process handle has been discarded regardless; the process may still
/// be running until the OS reclaims it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("mirror process (pid={pid}) could not be stopped: {reason}")]
pub struct TeardownError {
    pub pid: u32,
    pub reason: String,
}

/// The device-bridge tool.
///
/// Implementations run one directive per call and hold no state between
/// calls.  The provided methods are the directive vocabulary the supervisor
/// uses; implementors only supply [`BridgeTool::run`].
#[async_trait]
pub trait BridgeTool: Send + Sync {
    /// Runs a single directive and captures its exit code and combined output.
    async fn run(&self, command: &BridgeCommand) -> Result<BridgeCommandResult, ToolError>;

    async fn connect(&self, endpoint: &Endpoint) -> Result<BridgeCommandResult, ToolError> {
        self.run(&BridgeCommand::Connect(endpoint.clone())).await
    }

    async fn disconnect(&self, endpoint: &Endpoint) -> Result<BridgeCommandResult, ToolError> {
        self.run(&BridgeCommand::Disconnect(endpoint.clone())).await
    }

    /// Switches a USB-attached device to network listening mode on `port`.
    async fn set_network_mode(&self, port: u16) -> Result<BridgeCommandResult, ToolError> {
        self.run(&BridgeCommand::TcpIp(port)).await
    }

    async fn pair(
        &self,
        endpoint: &Endpoint,
        code: &str,
    ) -> Result<BridgeCommandResult, ToolError> {
        self.run(&BridgeCommand::Pair {
            endpoint: endpoint.clone(),
            code: code.to_string(),
        })
        .await
    }
}

/// Owner of the one mirroring subprocess.
#[async_trait]
pub trait MirrorControl: Send {
    /// Starts mirroring `endpoint` with the raw buffer field text.
    ///
    /// The buffer is validated before anything is spawned.  A process that is
    /// still live is stopped first; its stop outcome is only traced, so callers
    /// that report teardown call [`MirrorControl::stop`] themselves beforehand.
    async fn start(&mut self, endpoint: &Endpoint, buffer: &str) -> Result<u32, MirrorStartError>;

    /// Terminates, waits up to `timeout`, then kills.  Idempotent.
    async fn stop(&mut self, timeout: Duration) -> Result<StopOutcome, TeardownError>;

    /// Pid of the live process, if any.
    fn pid(&self) -> Option<u32>;

    fn is_live(&self) -> bool {
        self.pid().is_some()
    }
}

/// The connect form values could not be persisted.
#[derive(Debug, Error)]
#[error("could not save settings: {source}")]
pub struct ConfigSaveError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ConfigSaveError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Persistence of the last successful connect form values.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync {
    fn save_last_session(
        &self,
        endpoint: &Endpoint,
        buffer: BufferSetting,
    ) -> Result<(), ConfigSaveError>;
}
