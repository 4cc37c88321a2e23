//! Events flowing from the application layer back to the presentation layer.
//!
//! The presentation owns the receiving end of an unbounded channel; every
//! use case holds a cloned [`EventSink`].  Events from one operation arrive in
//! the order the operation emitted them.  Nothing is guaranteed about the
//! interleaving of events from unrelated operations.

use scrcpy_audio_core::{SessionState, StatusKind};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Severity of a user-facing log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line in the user-facing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    Log(LogLine),
    /// The supervisor moved to a new state.
    State { state: SessionState },
    /// Controls must be disabled while any command is in flight.
    Controls { enabled: bool },
    /// A command finished with the given classification.
    Outcome {
        command: &'static str,
        status: StatusKind,
    },
}

/// Sending half of the presentation event channel.
///
/// Every log line is also emitted as a `tracing` event at the matching level.
/// Sending never fails from the caller's point of view: once the presentation
/// has gone away, events are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl EventSink {
    /// Creates a sink together with the receiver the presentation reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }

    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        info!("{text}");
        self.log(LogLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("{text}");
        self.log(LogLevel::Warn, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        error!("{text}");
        self.log(LogLevel::Error, text);
    }

    fn log(&self, level: LogLevel, text: String) {
        self.emit(UiEvent::Log(LogLine { level, text }));
    }
}
