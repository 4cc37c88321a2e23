//! Scrcpy-Audio entry point.
//!
//! Wires the infrastructure adapters into a [`SessionSupervisor`] and drives
//! it through the command queue.
//!
//! ```text
//! main()
//!  ├─ load config (defaults on first run or malformed file)
//!  ├─ BinaryLocator::locate()      -- once; paths passed in explicitly
//!  ├─ SessionSupervisor::new(adb, scrcpy, config store, event sink)
//!  ├─ run_dispatcher               (Tokio task, one task per command)
//!  ├─ Ctrl-C handler               (posts Shutdown, nothing else)
//!  ├─ stdin reader                 (interactive mode only)
//!  └─ event loop: render events, fold outcomes into the exit code
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scrcpy_audio::application::events::{EventSink, UiEvent};
use scrcpy_audio::application::supervisor::SessionSupervisor;
use scrcpy_audio::infrastructure::bridge::AdbBridgeClient;
use scrcpy_audio::infrastructure::locator::BinaryLocator;
use scrcpy_audio::infrastructure::mirror::ScrcpyMirrorProcess;
use scrcpy_audio::infrastructure::storage::config::{config_file_path, load_or_default};
use scrcpy_audio::infrastructure::storage::{AppConfig, TomlConfigStore};
use scrcpy_audio::infrastructure::ui_bridge::{
    parse_command_line, render_json, render_text, run_dispatcher, CommandResult, ExitTracker,
    FollowUp, Interrupt, ParseError, RunMode, ToolPathsDto, UiCommand, COMMAND_QUEUE_DEPTH,
    FORCED_EXIT_CODE, HELP,
};
use scrcpy_audio_core::{AudioBitRate, Endpoint, StatusKind, DEFAULT_BRIDGE_PORT};

/// Command-line arguments for the Scrcpy-Audio supervisor.
#[derive(Debug, Parser)]
#[command(
    name = "scrcpy-audio",
    about = "Mirror an Android device's audio over the network via adb and scrcpy",
    version
)]
struct Cli {
    /// Settings file to read and update.
    #[arg(long, global = true, env = "SCRCPY_AUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the adb executable; overrides discovery.
    #[arg(long, global = true, env = "SCRCPY_AUDIO_ADB")]
    adb: Option<PathBuf>,

    /// Path to the scrcpy executable; overrides discovery.
    #[arg(long, global = true, env = "SCRCPY_AUDIO_SCRCPY")]
    scrcpy: Option<PathBuf>,

    /// Folder scanned for adb and scrcpy before the search path.
    #[arg(long, global = true, env = "SCRCPY_AUDIO_TOOLS_DIR")]
    tools_dir: Option<PathBuf>,

    /// Print events as JSON lines instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to HOST:PORT and mirror audio until Ctrl-C.
    Connect {
        /// Device address; defaults to the last successful connect.
        host: Option<String>,
        #[arg(long)]
        port: Option<String>,
        /// Audio buffer in milliseconds.
        #[arg(long)]
        buffer: Option<String>,
        /// scrcpy audio bit rate, e.g. `128K`.
        #[arg(long)]
        bit_rate: Option<String>,
    },
    /// Connect on port 5555 and mirror audio until Ctrl-C.
    QuickConnect {
        host: Option<String>,
        #[arg(long)]
        buffer: Option<String>,
        #[arg(long)]
        bit_rate: Option<String>,
    },
    /// Switch a USB-attached device to network mode.
    Tcpip {
        #[arg(long, default_value_t = DEFAULT_BRIDGE_PORT)]
        port: u16,
    },
    /// Pair with a device using a wireless-debugging code.
    Pair {
        /// Pairing address shown on the device, `HOST:PORT`.
        endpoint: String,
        code: String,
    },
    /// Disconnect adb from a device left connected by an earlier run.
    Disconnect {
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Read commands from stdin (`help` lists them).
    Interactive {
        #[arg(long)]
        bit_rate: Option<String>,
    },
    /// Print the resolved tool paths and exit.
    Locate,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().unwrap_or_else(|_| PathBuf::from("config.toml")),
    };
    let (config, config_err) = load_or_default(&config_path);

    // User-facing lines go to stdout; diagnostics go to stderr at the
    // configured level unless `RUST_LOG` overrides it.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    if let Some(e) = config_err {
        warn!("using default settings: {e}");
    }
    info!(config = %config_path.display(), "scrcpy-audio starting");

    let paths = BinaryLocator::new()
        .with_bridge_path(cli.adb.clone().or_else(|| config.tools.adb_path.clone()))
        .with_mirror_path(cli.scrcpy.clone().or_else(|| config.tools.scrcpy_path.clone()))
        .with_tools_dir(cli.tools_dir.clone().or_else(|| config.tools.tools_dir.clone()))
        .locate();

    if matches!(cli.command, Command::Locate) {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&CommandResult::ok(ToolPathsDto::from(&paths)))?
            );
        } else {
            println!("{paths}");
        }
        let found = paths.bridge.is_found() && paths.mirror.is_found();
        return Ok(exit_code(if found {
            StatusKind::Success
        } else {
            StatusKind::ToolNotFound
        }));
    }

    let (sink, mut events) = EventSink::channel();
    let json = cli.json;

    let (mode, initial) = match plan(&cli.command, &config) {
        Ok(plan) => plan,
        Err(message) => {
            sink.error(message);
            drain(&mut events, json);
            return Ok(exit_code(StatusKind::InvalidInput));
        }
    };

    let bit_rate = match bit_rate_setting(&cli.command, &config) {
        Ok(rate) => rate,
        Err(message) => {
            sink.error(message);
            drain(&mut events, json);
            return Ok(exit_code(StatusKind::InvalidInput));
        }
    };

    let supervisor = Arc::new(SessionSupervisor::new(
        Arc::new(AdbBridgeClient::new(paths.bridge.path.clone())),
        Box::new(ScrcpyMirrorProcess::new(paths.mirror.path.clone()).with_bit_rate(bit_rate)),
        Arc::new(TomlConfigStore::new(config_path, config.clone())),
        sink.clone(),
    ));
    sink.info(paths.to_string());

    let (commands, queue) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let mut dispatcher = tokio::spawn(run_dispatcher(Arc::clone(&supervisor), queue));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    {
        let commands = commands.clone();
        tokio::spawn(async move {
            let mut received = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                received += 1;
                match Interrupt::nth(received) {
                    Interrupt::Shutdown => {
                        info!("interrupt received, shutting down");
                        // Queued separately so a full queue never hides the next interrupt.
                        let commands = commands.clone();
                        tokio::spawn(async move {
                            let _ = commands.send(UiCommand::Shutdown).await;
                        });
                    }
                    Interrupt::ForceExit => {
                        warn!("second interrupt received, exiting without waiting for teardown");
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                }
            }
        });
    }

    // ── stdin reader (interactive mode) ───────────────────────────────────────
    if mode == RunMode::Interactive {
        let commands = commands.clone();
        let sink = sink.clone();
        let default_buffer = config.session.buffer_ms.to_string();
        sink.info("type `help` for the list of commands");
        // A plain thread: a pending stdin read must not hold up runtime
        // shutdown once `quit` or Ctrl-C has been handled.
        let (line_tx, mut lines) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(async move {
            loop {
                let command = match lines.recv().await {
                    Some(Ok(line)) => match parse_command_line(&line, &default_buffer) {
                        Ok(command) => command,
                        Err(ParseError::Empty) => continue,
                        Err(ParseError::Help) => {
                            sink.info(HELP);
                            continue;
                        }
                        Err(e) => {
                            sink.error(e.to_string());
                            continue;
                        }
                    },
                    None => UiCommand::Shutdown,
                    Some(Err(e)) => {
                        sink.error(format!("cannot read stdin: {e}"));
                        UiCommand::Shutdown
                    }
                };
                let last = command == UiCommand::Shutdown;
                if commands.send(command).await.is_err() || last {
                    break;
                }
            }
        });
    }

    if let Some(command) = initial {
        commands.send(command).await?;
    }

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut tracker = ExitTracker::new(mode);
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                render(&event, json);
                if let UiEvent::Outcome { command, status } = event {
                    if mode == RunMode::Session && command != "shutdown" && status == StatusKind::Success {
                        sink.info("audio mirroring is running; press Ctrl-C to stop");
                    }
                    match tracker.observe(command, status) {
                        FollowUp::Continue => {}
                        FollowUp::Shutdown => {
                            let _ = commands.send(UiCommand::Shutdown).await;
                        }
                        FollowUp::Exit => break,
                    }
                }
            }
            joined = &mut dispatcher => {
                if let Err(e) = joined {
                    warn!("dispatcher task ended abnormally: {e}");
                }
                while let Ok(event) = events.try_recv() {
                    render(&event, json);
                    if let UiEvent::Outcome { command, status } = event {
                        tracker.observe(command, status);
                    }
                }
                break;
            }
        }
    }

    info!(status = %tracker.status(), "scrcpy-audio stopped");
    Ok(exit_code(tracker.status()))
}

/// Chooses the run mode and the first command for a subcommand.
fn plan(command: &Command, config: &AppConfig) -> Result<(RunMode, Option<UiCommand>), String> {
    let saved_host = || config.session.host.clone();
    let saved_buffer = || config.session.buffer_ms.to_string();

    Ok(match command {
        Command::Connect {
            host, port, buffer, ..
        } => {
            let host = host
                .clone()
                .or_else(saved_host)
                .ok_or("no host given and none saved from an earlier connect")?;
            let port = port
                .clone()
                .or_else(|| config.session.port.map(|p| p.to_string()))
                .unwrap_or_default();
            let buffer = buffer.clone().unwrap_or_else(saved_buffer);
            (
                RunMode::Session,
                Some(UiCommand::Connect { host, port, buffer }),
            )
        }
        Command::QuickConnect { host, buffer, .. } => {
            let host = host
                .clone()
                .or_else(saved_host)
                .ok_or("no host given and none saved from an earlier connect")?;
            let buffer = buffer.clone().unwrap_or_else(saved_buffer);
            (
                RunMode::Session,
                Some(UiCommand::QuickConnect { host, buffer }),
            )
        }
        Command::Tcpip { port } => (
            RunMode::OneShot,
            Some(UiCommand::SetNetworkMode { port: *port }),
        ),
        Command::Pair { endpoint, code } => {
            let endpoint = endpoint
                .parse::<Endpoint>()
                .map_err(|e| format!("invalid pairing address `{endpoint}`: {e}"))?;
            (
                RunMode::OneShot,
                Some(UiCommand::Pair {
                    endpoint,
                    code: code.clone(),
                }),
            )
        }
        Command::Disconnect { host, port } => {
            let adopt = match host {
                Some(host) => Some(
                    Endpoint::new(host.as_str(), port.unwrap_or(DEFAULT_BRIDGE_PORT))
                        .map_err(|e| format!("cannot disconnect: {e}"))?,
                ),
                None => config.session.endpoint(),
            };
            (RunMode::OneShot, Some(UiCommand::Disconnect { adopt }))
        }
        Command::Interactive { .. } => (RunMode::Interactive, None),
        Command::Locate => (RunMode::OneShot, None),
    })
}

fn bit_rate_setting(command: &Command, config: &AppConfig) -> Result<Option<AudioBitRate>, String> {
    let raw = match command {
        Command::Connect { bit_rate, .. }
        | Command::QuickConnect { bit_rate, .. }
        | Command::Interactive { bit_rate } => bit_rate.clone(),
        _ => None,
    }
    .or_else(|| config.session.audio_bit_rate.clone());

    raw.map(|raw| AudioBitRate::parse(&raw).map_err(|e| e.to_string()))
        .transpose()
}

fn render(event: &UiEvent, json: bool) {
    if json {
        match render_json(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("could not encode event: {e}"),
        }
    } else if let Some(line) = render_text(event) {
        println!("{line}");
    }
}

fn drain(events: &mut mpsc::UnboundedReceiver<UiEvent>, json: bool) {
    while let Ok(event) = events.try_recv() {
        render(&event, json);
    }
}

fn exit_code(status: StatusKind) -> ExitCode {
    ExitCode::from(status.exit_code())
}
