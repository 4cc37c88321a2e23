//! Command bridge between the presentation and the supervisor.
//!
//! The presentation (the CLI in `main.rs`, or a graphical wrapper reading
//! `--json` output) never calls the supervisor directly.  It posts
//! [`UiCommand`]s on one queue; [`run_dispatcher`] spawns one task per
//! command so the presentation never waits on `adb` or `scrcpy`.
//!
//! While any command is in flight the dispatcher emits
//! `Controls { enabled: false }`; when the last one finishes it emits
//! `Controls { enabled: true }`.  Every command ends with exactly one
//! `Outcome` event.
//!
//! # `CommandResult<T>` wrapper
//!
//! One-shot queries (`locate`, `status`) answer with `CommandResult<T>` so a
//! JSON consumer always sees `{ success, data, error }`.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use scrcpy_audio_core::{Endpoint, SessionState, StatusKind, DEFAULT_BRIDGE_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::application::events::{EventSink, LogLevel, UiEvent};
use crate::application::supervisor::{SessionSupervisor, SupervisorError};
use crate::infrastructure::locator::ToolPaths;

/// Capacity of the presentation → dispatcher queue.
pub const COMMAND_QUEUE_DEPTH: usize = 32;

// ── Commands ──────────────────────────────────────────────────────────────────

/// A request from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Manual connect with raw form fields; validation happens downstream.
    Connect {
        host: String,
        port: String,
        buffer: String,
    },
    QuickConnect { host: String, buffer: String },
    SetNetworkMode { port: u16 },
    Pair { endpoint: Endpoint, code: String },
    /// Tear everything down.  `adopt` names a link made by an earlier run.
    Disconnect { adopt: Option<Endpoint> },
    Status,
    /// Tear down, refuse further work, and end the dispatcher.
    Shutdown,
}

impl UiCommand {
    pub fn name(&self) -> &'static str {
        match self {
            UiCommand::Connect { .. } => "connect",
            UiCommand::QuickConnect { .. } => "quick_connect",
            UiCommand::SetNetworkMode { .. } => "tcpip",
            UiCommand::Pair { .. } => "pair",
            UiCommand::Disconnect { .. } => "disconnect",
            UiCommand::Status => "status",
            UiCommand::Shutdown => "shutdown",
        }
    }
}

/// Why an interactive line could not be turned into a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid port `{0}`")]
    InvalidPort(String),

    #[error("invalid endpoint `{raw}`: {reason}")]
    InvalidEndpoint { raw: String, reason: String },

    /// Not an error as such: the user asked for the command list.
    #[error("{}", HELP)]
    Help,
}

pub const HELP: &str = "commands:
  connect HOST PORT [BUFFER]   connect and start audio mirroring
  quick HOST [BUFFER]          connect on port 5555
  tcpip [PORT]                 switch a USB device to network mode (default 5555)
  pair HOST:PORT CODE          pair using a wireless-debugging code
  disconnect                   disconnect adb and stop scrcpy
  status                       show the current session
  quit                         disconnect and exit";

/// Parses one line of the interactive console.
///
/// `default_buffer` fills in an omitted buffer argument.
pub fn parse_command_line(line: &str, default_buffer: &str) -> Result<UiCommand, ParseError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(ParseError::Empty);
    };
    let rest: Vec<&str> = words.collect();
    let buffer_or_default = |arg: Option<&&str>| {
        arg.map_or_else(|| default_buffer.to_string(), |b| b.to_string())
    };

    match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("connect", [host, port]) | ("connect", [host, port, _]) => Ok(UiCommand::Connect {
            host: host.to_string(),
            port: port.to_string(),
            buffer: buffer_or_default(rest.get(2)),
        }),
        ("connect", _) => Err(ParseError::Usage("connect HOST PORT [BUFFER]")),

        ("quick", [host]) | ("quick", [host, _]) => Ok(UiCommand::QuickConnect {
            host: host.to_string(),
            buffer: buffer_or_default(rest.get(1)),
        }),
        ("quick", _) => Err(ParseError::Usage("quick HOST [BUFFER]")),

        ("tcpip", []) => Ok(UiCommand::SetNetworkMode {
            port: DEFAULT_BRIDGE_PORT,
        }),
        ("tcpip", [port]) => match port.parse::<u16>() {
            Ok(port) if port != 0 => Ok(UiCommand::SetNetworkMode { port }),
            _ => Err(ParseError::InvalidPort(port.to_string())),
        },
        ("tcpip", _) => Err(ParseError::Usage("tcpip [PORT]")),

        ("pair", [endpoint, code]) => {
            let parsed = endpoint
                .parse::<Endpoint>()
                .map_err(|e| ParseError::InvalidEndpoint {
                    raw: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(UiCommand::Pair {
                endpoint: parsed,
                code: code.to_string(),
            })
        }
        ("pair", _) => Err(ParseError::Usage("pair HOST:PORT CODE")),

        ("disconnect", []) => Ok(UiCommand::Disconnect { adopt: None }),
        ("status", []) => Ok(UiCommand::Status),
        ("quit" | "exit", []) => Ok(UiCommand::Shutdown),
        ("help" | "?", _) => Err(ParseError::Help),
        ("disconnect" | "status" | "quit" | "exit", _) => Err(ParseError::Usage(
            "disconnect | status | quit take no arguments",
        )),
        (other, _) => Err(ParseError::Unknown(other.to_string())),
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Keeps the controls disabled while at least one command is in flight.
struct InFlight {
    count: Arc<AtomicUsize>,
    events: EventSink,
}

impl InFlight {
    fn enter(count: &Arc<AtomicUsize>, events: &EventSink) -> Self {
        if count.fetch_add(1, Ordering::SeqCst) == 0 {
            events.emit(UiEvent::Controls { enabled: false });
        }
        Self {
            count: Arc::clone(count),
            events: events.clone(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.events.emit(UiEvent::Controls { enabled: true });
        }
    }
}

/// Receives commands until `Shutdown` (or until every sender is dropped),
/// running each on its own task.
///
/// `Shutdown` is handled inline: the supervisor is closed and torn down,
/// then the remaining tasks are awaited and the function returns.
pub async fn run_dispatcher(
    supervisor: Arc<SessionSupervisor>,
    mut commands: mpsc::Receiver<UiCommand>,
) {
    let events = supervisor.events().clone();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    while let Some(command) = commands.recv().await {
        debug!(command = command.name(), "dispatching");
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}

        match command {
            UiCommand::Status => {
                report_status(&supervisor, &events);
                events.emit(UiEvent::Outcome {
                    command: "status",
                    status: StatusKind::Success,
                });
            }
            UiCommand::Shutdown => {
                let _guard = InFlight::enter(&in_flight, &events);
                let status = match supervisor.shutdown().await {
                    Ok(()) => StatusKind::Success,
                    Err(e) => SupervisorError::from(e).kind(),
                };
                events.emit(UiEvent::Outcome {
                    command: "shutdown",
                    status,
                });
                break;
            }
            command => {
                let guard = InFlight::enter(&in_flight, &events);
                let supervisor = Arc::clone(&supervisor);
                let events = events.clone();
                tasks.spawn(async move {
                    let name = command.name();
                    let status = execute(&supervisor, command).await;
                    events.emit(UiEvent::Outcome {
                        command: name,
                        status,
                    });
                    drop(guard);
                });
            }
        }
    }

    while tasks.join_next().await.is_some() {}
}

async fn execute(supervisor: &SessionSupervisor, command: UiCommand) -> StatusKind {
    let result = match command {
        UiCommand::Connect { host, port, buffer } => supervisor
            .connect_fields(&host, &port, &buffer)
            .await
            .map(|_| ()),
        UiCommand::QuickConnect { host, buffer } => supervisor
            .quick_connect(&host, &buffer)
            .await
            .map(|_| ()),
        UiCommand::SetNetworkMode { port } => {
            supervisor.set_network_mode(port).await.map(|_| ())
        }
        UiCommand::Pair { endpoint, code } => supervisor.pair(endpoint, &code).await.map(|_| ()),
        UiCommand::Disconnect { adopt } => {
            if let Some(endpoint) = adopt {
                supervisor.adopt_link(endpoint);
            }
            supervisor.disconnect_all().await.map_err(SupervisorError::from)
        }
        UiCommand::Status | UiCommand::Shutdown => Ok(()),
    };
    match result {
        Ok(()) => StatusKind::Success,
        Err(e) => e.kind(),
    }
}

fn report_status(supervisor: &SessionSupervisor, events: &EventSink) {
    events.info(session_snapshot(supervisor).to_string());
}

// ── Exit policy ───────────────────────────────────────────────────────────────

/// How the binary was asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One directive (`tcpip`, `pair`, `disconnect`), then exit.
    OneShot,
    /// Connect, then mirror until interrupted.
    Session,
    /// Read commands from stdin until `quit` or end of input.
    Interactive,
}

/// What the presentation should do after an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Continue,
    /// Post `Shutdown` on the command queue.
    Shutdown,
    Exit,
}

/// Folds command outcomes into the process exit status.
#[derive(Debug)]
pub struct ExitTracker {
    mode: RunMode,
    status: StatusKind,
}

impl ExitTracker {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            status: StatusKind::Success,
        }
    }

    /// The first failure recorded, or `Success`.
    pub fn status(&self) -> StatusKind {
        self.status
    }

    pub fn observe(&mut self, command: &str, status: StatusKind) -> FollowUp {
        if command == "shutdown" {
            self.record(status);
            return FollowUp::Exit;
        }
        match self.mode {
            RunMode::OneShot => {
                self.record(status);
                FollowUp::Exit
            }
            RunMode::Session if status != StatusKind::Success => {
                self.record(status);
                FollowUp::Shutdown
            }
            RunMode::Session | RunMode::Interactive => FollowUp::Continue,
        }
    }

    fn record(&mut self, status: StatusKind) {
        if self.status == StatusKind::Success {
            self.status = status;
        }
    }
}

/// Exit code used when a repeated interrupt abandons teardown.
pub const FORCED_EXIT_CODE: i32 = 130;

/// What the `n`-th Ctrl-C (counting from 1) asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Queue an orderly `Shutdown`.
    Shutdown,
    /// Exit immediately, even if teardown is still waiting on a tool.
    ForceExit,
}

impl Interrupt {
    pub fn nth(n: u32) -> Self {
        if n <= 1 {
            Interrupt::Shutdown
        } else {
            Interrupt::ForceExit
        }
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// Resolved tool locations as reported by `locate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPathsDto {
    pub adb: Option<String>,
    pub scrcpy: Option<String>,
}

impl From<&ToolPaths> for ToolPathsDto {
    fn from(paths: &ToolPaths) -> Self {
        let shown = |tool: &crate::infrastructure::locator::ResolvedTool| {
            tool.is_found().then(|| tool.path.display().to_string())
        };
        Self {
            adb: shown(&paths.bridge),
            scrcpy: shown(&paths.mirror),
        }
    }
}

/// Snapshot of the supervisor for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDto {
    pub state: SessionState,
    pub endpoint: Option<String>,
    pub pid: Option<u32>,
    pub buffer_ms: Option<u32>,
}

impl fmt::Display for SessionDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state: {}", self.state)?;
        if let Some(endpoint) = &self.endpoint {
            write!(f, ", mirroring {endpoint}")?;
        }
        if let Some(pid) = self.pid {
            write!(f, " (pid={pid}")?;
            if let Some(ms) = self.buffer_ms {
                write!(f, ", buffer={ms} ms")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

pub fn session_snapshot(supervisor: &SessionSupervisor) -> SessionDto {
    let session = supervisor.current_session();
    SessionDto {
        state: supervisor.state(),
        endpoint: session.as_ref().map(|s| s.endpoint.to_string()),
        pid: session.as_ref().and_then(|s| s.pid),
        buffer_ms: session.as_ref().map(|s| s.buffer.millis()),
    }
}

/// Unified response wrapper for one-shot queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Human-readable rendering; `None` for events with no text form.
pub fn render_text(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::Log(line) => Some(match line.level {
            LogLevel::Info => line.text.clone(),
            LogLevel::Warn => format!("warning: {}", line.text),
            LogLevel::Error => format!("error: {}", line.text),
        }),
        UiEvent::State { .. } | UiEvent::Controls { .. } | UiEvent::Outcome { .. } => None,
    }
}

/// One JSON object per line for a graphical wrapper.
pub fn render_json(event: &UiEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
