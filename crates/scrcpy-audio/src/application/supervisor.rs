//! SessionSupervisor: connection and process lifecycle state machine.
//!
//! The supervisor ties the bridge tool and the mirror process together:
//!
//! ```text
//! connect(endpoint, buffer)
//!   validate buffer ─► adb connect ─► [affirmed] save settings ─► scrcpy start ─► Active
//!                          │
//!                          └─ [refused / tool missing] ───────────────────────► Idle
//!
//! disconnect_all()
//!   adb disconnect (best-effort) ─► wait for session lock ─► scrcpy stop (best-effort) ─► Idle
//! ```
//!
//! # Single flight
//!
//! The mirror process and the session descriptor live behind one async mutex,
//! the *session lock*.  `connect`, `set_network_mode` and `pair` take it with
//! `try_lock` and fail with [`SupervisorError::Busy`] instead of queueing.
//! `disconnect_all` always proceeds: it issues its bridge disconnect straight
//! away, then waits for the lock before touching the mirror process.
//!
//! # Link tracking
//!
//! The endpoint of an in-flight connect (`pending`) and of the last affirmed
//! link (`linked`) are tracked outside the session lock so teardown can reach
//! them without waiting.  At most one link is tracked: an affirmed connect to
//! a different endpoint disconnects the link it replaces.  Each affirmed link bumps an epoch; if the epoch moved
//! while teardown waited for the lock, the newer link is disconnected too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use scrcpy_audio_core::{
    BridgeCommandResult, BufferSetting, Endpoint, EndpointError, MirrorSession, SessionState,
    SettingError, StatusKind, DEFAULT_BRIDGE_PORT,
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::application::events::{EventSink, UiEvent};
use crate::application::ports::{
    BridgeTool, ConfigStore, MirrorControl, MirrorStartError, StopOutcome, TeardownError,
    ToolError, DEFAULT_STOP_TIMEOUT,
};

/// Error type for supervisor operations.
///
/// Every variant is recovered at the supervisor boundary: by the time a caller
/// sees it, the matching log line has already been emitted.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    #[error("{0}")]
    InvalidSetting(#[from] SettingError),

    #[error("pairing code must be a non-empty string of digits")]
    InvalidPairingCode,

    #[error("another connect or teardown is in progress")]
    Busy,

    #[error("shutting down")]
    Closed,

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("adb {directive} {target} was not affirmed ({})", .result.summary())]
    BridgeFailure {
        directive: &'static str,
        target: String,
        result: BridgeCommandResult,
    },

    #[error("{0}")]
    MirrorStart(#[from] MirrorStartError),

    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

impl SupervisorError {
    /// Classification surfaced to the presentation layer.
    pub fn kind(&self) -> StatusKind {
        match self {
            SupervisorError::InvalidEndpoint(_)
            | SupervisorError::InvalidSetting(_)
            | SupervisorError::InvalidPairingCode => StatusKind::InvalidInput,
            SupervisorError::Busy | SupervisorError::Closed => StatusKind::Busy,
            SupervisorError::Tool(e) => e.kind(),
            SupervisorError::BridgeFailure { .. } => StatusKind::BridgeFailure,
            SupervisorError::MirrorStart(e) => e.kind(),
            SupervisorError::Teardown(_) => StatusKind::TeardownError,
        }
    }
}

/// Result of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub endpoint: Endpoint,
    pub buffer: BufferSetting,
    pub pid: u32,
}

/// State guarded by the session lock.
struct SessionSlot {
    mirror: Box<dyn MirrorControl>,
    current: Option<MirrorSession>,
}

#[derive(Debug, Default)]
struct LinkTracker {
    pending: Option<Endpoint>,
    linked: Option<Endpoint>,
    epoch: u64,
}

impl LinkTracker {
    fn teardown_targets(&self) -> (Vec<Endpoint>, u64) {
        let mut targets: Vec<Endpoint> = self.linked.iter().cloned().collect();
        if let Some(ep) = &self.pending {
            if !targets.contains(ep) {
                targets.push(ep.clone());
            }
        }
        (targets, self.epoch)
    }
}

/// The connection and process lifecycle supervisor.
pub struct SessionSupervisor {
    bridge: Arc<dyn BridgeTool>,
    config: Arc<dyn ConfigStore>,
    session: Mutex<SessionSlot>,
    link: StdMutex<LinkTracker>,
    snapshot: StdMutex<Option<MirrorSession>>,
    state_tx: watch::Sender<SessionState>,
    events: EventSink,
    stop_timeout: Duration,
    closed: AtomicBool,
}

impl SessionSupervisor {
    /// Creates an idle supervisor owning `mirror`.
    pub fn new(
        bridge: Arc<dyn BridgeTool>,
        mirror: Box<dyn MirrorControl>,
        config: Arc<dyn ConfigStore>,
        events: EventSink,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            bridge,
            config,
            session: Mutex::new(SessionSlot {
                mirror,
                current: None,
            }),
            link: StdMutex::new(LinkTracker::default()),
            snapshot: StdMutex::new(None),
            state_tx,
            events,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Overrides the grace period between terminate and kill.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Descriptor of the live mirror session, if any.
    pub fn current_session(&self) -> Option<MirrorSession> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Records a bridge link established outside this process (for example by
    /// a previous run) so that the next teardown disconnects it.
    pub fn adopt_link(&self, endpoint: Endpoint) {
        self.link().linked = Some(endpoint);
    }

    /// Validates the raw host and port fields, then connects.
    pub async fn connect_fields(
        &self,
        host: &str,
        port: &str,
        buffer: &str,
    ) -> Result<ConnectReport, SupervisorError> {
        match Endpoint::from_fields(host, port) {
            Ok(endpoint) => self.connect(endpoint, buffer).await,
            Err(e) => {
                self.events.error(format!("cannot connect: {e}"));
                Err(e.into())
            }
        }
    }

    /// Connects to `host` on the default bridge port (5555).
    pub async fn quick_connect(
        &self,
        host: &str,
        buffer: &str,
    ) -> Result<ConnectReport, SupervisorError> {
        self.connect_fields(host, &DEFAULT_BRIDGE_PORT.to_string(), buffer)
            .await
    }

    /// Drives the bridge connect and, once affirmed, starts mirroring.
    ///
    /// A second request while any sequence is in flight fails with
    /// [`SupervisorError::Busy`].  On return the state is `Active` if a mirror
    /// process is live and `Idle` otherwise.  A mirror start failure after an
    /// affirmed bridge connect leaves the bridge link up.
    ///
    /// Once the new link is affirmed, a previous session is torn down before
    /// the new mirror starts.  A refused connect leaves it untouched.
    pub async fn connect(
        &self,
        endpoint: Endpoint,
        buffer: &str,
    ) -> Result<ConnectReport, SupervisorError> {
        let Ok(mut slot) = self.session.try_lock() else {
            self.events.warn(format!(
                "connect to {endpoint} rejected: another operation is in progress"
            ));
            return Err(SupervisorError::Busy);
        };
        self.ensure_open(&format!("connect to {endpoint}"))?;

        let buffer = match BufferSetting::parse(buffer) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.events
                    .error(format!("connect to {endpoint} rejected: {e}"));
                return Err(e.into());
            }
        };

        self.link().pending = Some(endpoint.clone());
        self.set_state(SessionState::Connecting);
        self.events.info(format!("connecting to {endpoint} ..."));

        let result = self.connect_locked(&mut slot, &endpoint, buffer).await;
        self.link().pending = None;

        let live = slot.mirror.is_live();
        if !live {
            slot.current = None;
        }
        self.publish(&slot);
        self.set_state(if live {
            SessionState::Active
        } else {
            SessionState::Idle
        });

        match &result {
            Ok(report) => self.events.info(format!(
                "scrcpy started (audio) on {} (pid={})",
                report.endpoint, report.pid
            )),
            Err(e) => self.events.error(connect_failure_line(&endpoint, e)),
        }
        result
    }

    async fn connect_locked(
        &self,
        slot: &mut SessionSlot,
        endpoint: &Endpoint,
        buffer: BufferSetting,
    ) -> Result<ConnectReport, SupervisorError> {
        let result = self.bridge.connect(endpoint).await?;
        self.events.info(format!("[adb connect] {}", result.summary()));
        if !result.is_connect_affirmative() {
            return Err(SupervisorError::BridgeFailure {
                directive: "connect",
                target: endpoint.to_string(),
                result,
            });
        }

        let replaced = {
            let mut link = self.link();
            link.epoch += 1;
            link.linked.replace(endpoint.clone())
        };
        self.set_state(SessionState::Connected);

        if let Err(e) = self.config.save_last_session(endpoint, buffer) {
            self.events.warn(e.to_string());
        }

        // The previous session is retired in teardown order: its link first,
        // then its mirror process.
        if let Some(previous) = replaced.filter(|previous| previous != endpoint) {
            self.disconnect_bridge(&previous).await;
        }
        if slot.mirror.is_live() {
            // A stop failure is already reported; the handle is gone either way.
            let _ = self.stop_mirror(slot).await;
        }

        self.events
            .info(format!("connected via adb; starting scrcpy (audio) on {endpoint} ..."));
        let pid = slot.mirror.start(endpoint, &buffer.to_string()).await?;
        slot.current = Some(MirrorSession {
            endpoint: endpoint.clone(),
            buffer,
            pid: Some(pid),
        });

        Ok(ConnectReport {
            endpoint: endpoint.clone(),
            buffer,
            pid,
        })
    }

    /// Tears down the bridge link and the mirror process, in that order.
    ///
    /// Both steps are best-effort: a failed bridge disconnect never prevents
    /// the mirror stop.  Calling this while idle is a no-op.  The only error
    /// surfaced is a [`TeardownError`] when the mirror process could be
    /// neither terminated nor killed; its handle is discarded regardless.
    pub async fn disconnect_all(&self) -> Result<(), TeardownError> {
        let (targets, epoch) = self.link().teardown_targets();
        if !targets.is_empty() {
            self.set_state(SessionState::Disconnecting);
        }
        for endpoint in &targets {
            self.disconnect_bridge(endpoint).await;
        }

        let mut slot = self.session.lock().await;

        let late = {
            let mut link = self.link();
            let late = if link.epoch != epoch {
                link.linked.clone()
            } else {
                None
            };
            link.linked = None;
            late
        };
        if let Some(endpoint) = &late {
            self.set_state(SessionState::Disconnecting);
            self.disconnect_bridge(endpoint).await;
        }

        if targets.is_empty() && late.is_none() && !slot.mirror.is_live() {
            self.events.info("nothing to disconnect");
            self.set_state(SessionState::Idle);
            return Ok(());
        }

        self.set_state(SessionState::Disconnecting);
        let result = self.stop_mirror(&mut slot).await;
        self.publish(&slot);
        self.set_state(SessionState::Idle);
        result
    }

    /// Refuses all further requests, then runs [`Self::disconnect_all`].
    ///
    /// Requests that were queued behind the shutdown fail with
    /// [`SupervisorError::Closed`] instead of starting a new session.
    pub async fn shutdown(&self) -> Result<(), TeardownError> {
        self.closed.store(true, Ordering::SeqCst);
        self.disconnect_all().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self, what: &str) -> Result<(), SupervisorError> {
        if self.is_closed() {
            self.events.warn(format!("{what} rejected: shutting down"));
            return Err(SupervisorError::Closed);
        }
        Ok(())
    }

    /// Runs `adb tcpip <port>` so a USB-attached device starts listening on
    /// the network.  The device still has to be reached with a connect.
    pub async fn set_network_mode(
        &self,
        port: u16,
    ) -> Result<BridgeCommandResult, SupervisorError> {
        let Ok(_slot) = self.session.try_lock() else {
            self.events
                .warn("set network mode rejected: another operation is in progress");
            return Err(SupervisorError::Busy);
        };
        self.ensure_open("set network mode")?;
        if port == 0 {
            let err = SupervisorError::from(EndpointError::InvalidPort(port.to_string()));
            self.events.error(format!("cannot set network mode: {err}"));
            return Err(err);
        }

        self.events
            .info(format!("switching device to network mode on port {port} ..."));
        match self.bridge.set_network_mode(port).await {
            Ok(result) if result.succeeded() => {
                self.events.info(format!(
                    "OK: port {port} set over USB. Unplug the cable and use quick or manual connect."
                ));
                Ok(result)
            }
            Ok(result) => {
                self.events
                    .error(format!("failed to set port over USB: ({})", result.summary()));
                Err(SupervisorError::BridgeFailure {
                    directive: "tcpip",
                    target: port.to_string(),
                    result,
                })
            }
            Err(e) => {
                self.events.error(format!("failed to set port over USB: {e}"));
                Err(e.into())
            }
        }
    }

    /// Forwards a wireless-debugging pairing code to the bridge tool.
    pub async fn pair(
        &self,
        endpoint: Endpoint,
        code: &str,
    ) -> Result<BridgeCommandResult, SupervisorError> {
        let Ok(_slot) = self.session.try_lock() else {
            self.events
                .warn(format!("pairing with {endpoint} rejected: another operation is in progress"));
            return Err(SupervisorError::Busy);
        };
        self.ensure_open(&format!("pairing with {endpoint}"))?;
        let code = code.trim();
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            let err = SupervisorError::InvalidPairingCode;
            self.events.error(format!("cannot pair with {endpoint}: {err}"));
            return Err(err);
        }

        self.events.info(format!("pairing with {endpoint} ..."));
        match self.bridge.pair(&endpoint, code).await {
            Ok(result) if result.is_pair_affirmative() => {
                self.events.info(format!("[adb pair] {}", result.summary()));
                Ok(result)
            }
            Ok(result) => {
                self.events.error(format!("[adb pair] {}", result.summary()));
                Err(SupervisorError::BridgeFailure {
                    directive: "pair",
                    target: endpoint.to_string(),
                    result,
                })
            }
            Err(e) => {
                self.events
                    .error(format!("[adb pair] exit={}. {e}", e.exit_code()));
                Err(e.into())
            }
        }
    }

    async fn disconnect_bridge(&self, endpoint: &Endpoint) {
        self.events.info(format!("disconnecting {endpoint} ..."));
        match self.bridge.disconnect(endpoint).await {
            Ok(result) if result.succeeded() => {
                self.events
                    .info(format!("[adb disconnect] {}", result.summary()));
            }
            Ok(result) => {
                self.events
                    .warn(format!("[adb disconnect] {}", result.summary()));
            }
            Err(e) => {
                self.events
                    .warn(format!("[adb disconnect] exit={}. {e}", e.exit_code()));
            }
        }
    }

    async fn stop_mirror(&self, slot: &mut SessionSlot) -> Result<(), TeardownError> {
        let result = slot.mirror.stop(self.stop_timeout).await;
        slot.current = None;
        match &result {
            Ok(StopOutcome::NotRunning) => self.events.info("no scrcpy process to stop"),
            Ok(StopOutcome::AlreadyExited { pid, code }) => self.events.info(format!(
                "scrcpy (pid={pid}) had already exited (code {})",
                code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )),
            Ok(StopOutcome::Terminated { pid }) => {
                self.events.info(format!("scrcpy (pid={pid}) terminated."));
            }
            Ok(StopOutcome::Killed { pid }) => self.events.warn(format!(
                "scrcpy (pid={pid}) ignored terminate for {:?}; killed.",
                self.stop_timeout
            )),
            Err(e) => self.events.error(format!("{e}; handle discarded")),
        }
        result.map(|_| ())
    }

    fn publish(&self, slot: &SessionSlot) {
        *self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = slot.current.clone();
    }

    fn set_state(&self, state: SessionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            self.events.emit(UiEvent::State { state });
        }
    }

    fn link(&self) -> MutexGuard<'_, LinkTracker> {
        self.link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn connect_failure_line(endpoint: &Endpoint, err: &SupervisorError) -> String {
    match err {
        SupervisorError::BridgeFailure { .. } => format!(
            "failed to connect to {endpoint} via adb. Check the host and port or pair the device."
        ),
        SupervisorError::MirrorStart(e) => {
            format!("adb link to {endpoint} is up but scrcpy did not start: {e}")
        }
        other => format!("cannot connect to {endpoint}: {other}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
