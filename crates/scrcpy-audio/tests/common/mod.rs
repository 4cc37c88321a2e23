//! Shared helpers for the subprocess-backed integration tests.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scrcpy_audio::application::events::{EventSink, LogLevel, LogLine, UiEvent};
use scrcpy_audio::application::supervisor::SessionSupervisor;
use scrcpy_audio::infrastructure::bridge::AdbBridgeClient;
use scrcpy_audio::infrastructure::mirror::ScrcpyMirrorProcess;
use scrcpy_audio::infrastructure::storage::{AppConfig, TomlConfigStore};
use tokio::sync::mpsc;

/// A scratch directory holding fake tools and a settings file.
pub struct Sandbox {
    pub dir: PathBuf,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("{prefix}_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create sandbox");
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Writes an executable `/bin/sh` script.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }

    /// A fake `adb` that affirms connects and records every invocation.
    pub fn affirming_adb(&self) -> PathBuf {
        let calls = self.path("adb_calls.txt");
        self.script(
            "adb",
            &format!(
                r#"echo "$@" >> '{}'
case "$1" in
  connect) echo "connected to $2" ;;
  disconnect) echo "disconnected $2" ;;
  *) echo "unexpected: $1" >&2; exit 1 ;;
esac"#,
                calls.display()
            ),
        )
    }

    pub fn adb_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("adb_calls.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// A fake `scrcpy` that records its arguments, then idles.
    pub fn idle_scrcpy(&self) -> PathBuf {
        let args = self.path("scrcpy_args.txt");
        self.script(
            "scrcpy",
            &format!("echo \"$@\" > '{}'\nexec sleep 30", args.display()),
        )
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

/// Supervisor wired to real adapters for the given executables.
pub fn supervisor(
    sandbox: &Sandbox,
    adb: &Path,
    scrcpy: &Path,
) -> (Arc<SessionSupervisor>, mpsc::UnboundedReceiver<UiEvent>) {
    let (events, rx) = EventSink::channel();
    let supervisor = SessionSupervisor::new(
        Arc::new(AdbBridgeClient::new(adb)),
        Box::new(ScrcpyMirrorProcess::new(scrcpy)),
        Arc::new(TomlConfigStore::new(
            sandbox.path("config.toml"),
            AppConfig::default(),
        )),
        events,
    )
    .with_stop_timeout(Duration::from_millis(300));
    (Arc::new(supervisor), rx)
}

/// Polls until `path` holds a complete line, or panics after ~5 s.
pub async fn wait_for_line(path: &Path) -> String {
    for _ in 0..200 {
        if let Ok(content) = std::fs::read_to_string(path) {
            if content.ends_with('\n') {
                return content.trim_end().to_string();
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{} was never written", path.display());
}

pub fn drain_logs(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<LogLine> {
    let mut lines = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let UiEvent::Log(line) = event {
            lines.push(line);
        }
    }
    lines
}

pub fn count_level(lines: &[LogLine], level: LogLevel) -> usize {
    lines.iter().filter(|l| l.level == level).count()
}
