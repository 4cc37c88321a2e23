//! Endpoint domain value.
//!
//! An [`Endpoint`] identifies the Android device's network bridge listener.
//! It is built from the two form fields (host and port) and is immutable once
//! a connect attempt starts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port the bridge daemon listens on after `adb tcpip` with no explicit port.
pub const DEFAULT_BRIDGE_PORT: u16 = 5555;

/// Errors produced when validating endpoint form input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The host field is empty or whitespace.
    #[error("host is empty")]
    EmptyHost,

    /// The host contains whitespace or a path separator.
    #[error("host '{0}' contains invalid characters")]
    InvalidHost(String),

    /// The port field is empty.
    #[error("port is empty")]
    EmptyPort,

    /// The port is not an integer in 1–65535.
    #[error("port '{0}' is not a number between 1 and 65535")]
    InvalidPort(String),

    /// A combined `host:port` string has no `:` separator.
    #[error("'{0}' is not in host:port form")]
    MissingPort(String),
}

/// Host and port of the device's bridge listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from an already-typed port.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::EmptyHost`] / [`EndpointError::InvalidHost`]
    /// for a bad host, and [`EndpointError::InvalidPort`] for port `0`.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, EndpointError> {
        let host = validate_host(host.into())?;
        if port == 0 {
            return Err(EndpointError::InvalidPort(port.to_string()));
        }
        Ok(Self { host, port })
    }

    /// Creates an endpoint from the raw text of the host and port fields.
    ///
    /// Both fields are trimmed first, matching what a user sees in the form.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] describing the first invalid field.
    pub fn from_fields(host: &str, port: &str) -> Result<Self, EndpointError> {
        let port = port.trim();
        if port.is_empty() {
            return Err(EndpointError::EmptyPort);
        }
        let parsed = port
            .parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
        Self::new(host.trim(), parsed)
    }

    /// Returns the host part.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port part.
    pub fn port(&self) -> u16 {
        self.port
    }
}

fn validate_host(host: String) -> Result<String, EndpointError> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::EmptyHost);
    }
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    {
        return Err(EndpointError::InvalidHost(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    /// Parses `host:port`.  The split happens at the last `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.rsplit_once(':') {
            Some((host, port)) => Self::from_fields(host, port),
            None if s.is_empty() => Err(EndpointError::EmptyHost),
            None => Err(EndpointError::MissingPort(s.to_string())),
        }
    }
}
