//! `scrcpy` adapter: owns the single audio-mirroring subprocess.
//!
//! # Shutdown sequence
//!
//! 1. Reap the child if it already exited on its own.
//! 2. Ask it to terminate (`SIGTERM` on Unix; Windows has no graceful signal,
//!    so the request is the hard terminate).
//! 3. Wait up to the caller's timeout.
//! 4. Kill it and wait for the kill to land.
//!
//! The handle is dropped on every path.  Children are spawned with
//! kill-on-drop, so dropping a [`ScrcpyMirrorProcess`] that still owns a
//! process does not leak it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use scrcpy_audio_core::{AudioBitRate, BufferSetting, Endpoint, MirrorArgs};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::application::ports::{
    MirrorControl, MirrorStartError, StopOutcome, TeardownError, ToolError, DEFAULT_STOP_TIMEOUT,
};
use crate::infrastructure::process::{spawn_error, tool_command};

struct LiveChild {
    child: Child,
    pid: u32,
}

/// [`MirrorControl`] backed by the real `scrcpy` executable.
pub struct ScrcpyMirrorProcess {
    program: PathBuf,
    bit_rate: Option<AudioBitRate>,
    live: Option<LiveChild>,
}

impl ScrcpyMirrorProcess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            bit_rate: None,
            live: None,
        }
    }

    /// Passes `--audio-bit-rate=<rate>` on every start.
    pub fn with_bit_rate(mut self, bit_rate: Option<AudioBitRate>) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl MirrorControl for ScrcpyMirrorProcess {
    async fn start(&mut self, endpoint: &Endpoint, buffer: &str) -> Result<u32, MirrorStartError> {
        let buffer = BufferSetting::parse(buffer)?;

        if self.live.is_some() {
            if let Err(e) = self.stop(DEFAULT_STOP_TIMEOUT).await {
                warn!("previous scrcpy process not stopped cleanly: {e}");
            }
        }

        let args = MirrorArgs::new(endpoint.clone(), buffer)
            .with_bit_rate(self.bit_rate.clone())
            .to_args();
        debug!(program = %self.program.display(), ?args, "spawning scrcpy");

        let child = tool_command(&self.program)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error("scrcpy", &self.program, e))?;

        let Some(pid) = child.id() else {
            return Err(ToolError::Spawn {
                tool: "scrcpy",
                message: "process exited before its pid was observed".to_string(),
            }
            .into());
        };

        info!(pid, %endpoint, "scrcpy started");
        self.live = Some(LiveChild { child, pid });
        Ok(pid)
    }

    async fn stop(&mut self, timeout: Duration) -> Result<StopOutcome, TeardownError> {
        let Some(LiveChild { mut child, pid }) = self.live.take() else {
            return Ok(StopOutcome::NotRunning);
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(StopOutcome::AlreadyExited {
                    pid,
                    code: status.code(),
                });
            }
            Ok(None) => {}
            Err(e) => warn!(pid, "could not poll scrcpy: {e}"),
        }

        match request_terminate(&mut child, pid) {
            Ok(()) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(Ok(_)) => return Ok(StopOutcome::Terminated { pid }),
                Ok(Err(e)) => warn!(pid, "waiting for scrcpy failed: {e}"),
                Err(_) => info!(pid, "scrcpy did not exit within {timeout:?}, killing"),
            },
            Err(e) => warn!(pid, "terminate request failed: {e}"),
        }

        child
            .kill()
            .await
            .map(|()| StopOutcome::Killed { pid })
            .map_err(|e| TeardownError {
                pid,
                reason: e.to_string(),
            })
    }

    fn pid(&self) -> Option<u32> {
        self.live.as_ref().map(|live| live.pid)
    }
}

#[cfg(unix)]
fn request_terminate(_child: &mut Child, pid: u32) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(pid).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range")
    })?;
    // SAFETY: `pid` belongs to a child we spawned and have not reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child, _pid: u32) -> std::io::Result<()> {
    child.start_kill()
}
