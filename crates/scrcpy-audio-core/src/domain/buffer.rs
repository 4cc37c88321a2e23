//! Audio buffer and bit-rate values handed to the mirroring tool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buffer used when no configuration has been saved yet.
pub const DEFAULT_BUFFER_MS: u32 = 200;

/// Errors produced when validating the buffer or bit-rate form fields.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingError {
    /// The buffer text contains something other than ASCII digits.
    #[error("buffer '{0}' is not a whole number of milliseconds")]
    NotNumeric(String),

    /// The buffer is numeric but does not fit in 32 bits.
    #[error("buffer '{0}' is too large")]
    OutOfRange(String),

    /// The bit rate is not `<digits>` optionally followed by `K` or `M`.
    #[error("audio bit rate '{0}' must look like 128000, 128K or 1M")]
    InvalidBitRate(String),
}

/// Audio buffer length in milliseconds.
///
/// Only purely numeric text is accepted; there is no silent fallback to a
/// default when the field is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSetting(u32);

impl BufferSetting {
    /// Wraps an already-numeric millisecond value.
    pub fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Validates the raw text of the buffer field.
    ///
    /// Surrounding whitespace is ignored; an empty field, a sign, a decimal
    /// point, or any non-digit character is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::NotNumeric`] or [`SettingError::OutOfRange`].
    pub fn parse(raw: &str) -> Result<Self, SettingError> {
        let text = raw.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SettingError::NotNumeric(raw.to_string()));
        }
        text.parse::<u32>()
            .map(Self)
            .map_err(|_| SettingError::OutOfRange(raw.to_string()))
    }

    /// Returns the buffer length in milliseconds.
    pub fn millis(self) -> u32 {
        self.0
    }
}

impl Default for BufferSetting {
    fn default() -> Self {
        Self(DEFAULT_BUFFER_MS)
    }
}

impl fmt::Display for BufferSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BufferSetting {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Optional `--audio-bit-rate` value, kept in the tool's own notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioBitRate(String);

impl AudioBitRate {
    /// Validates a bit rate such as `128000`, `128K` or `2M`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::InvalidBitRate`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, SettingError> {
        let text = raw.trim();
        let digits = text
            .strip_suffix(&['K', 'k', 'M', 'm'][..])
            .unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SettingError::InvalidBitRate(raw.to_string()));
        }
        Ok(Self(text.to_ascii_uppercase()))
    }

    /// Returns the bit rate in the tool's notation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioBitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
