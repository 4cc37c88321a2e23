//! Mirroring tool (`scrcpy`) argument rendering.
//!
//! The argument set is fixed: no window, no video, playback audio only, the
//! user's buffer, an optional bit rate, and the network target.

use crate::domain::buffer::{AudioBitRate, BufferSetting};
use crate::domain::endpoint::Endpoint;

/// Audio-only mirroring request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorArgs {
    pub endpoint: Endpoint,
    pub buffer: BufferSetting,
    pub bit_rate: Option<AudioBitRate>,
}

impl MirrorArgs {
    pub fn new(endpoint: Endpoint, buffer: BufferSetting) -> Self {
        Self {
            endpoint,
            buffer,
            bit_rate: None,
        }
    }

    /// Sets the optional `--audio-bit-rate` value.
    pub fn with_bit_rate(mut self, bit_rate: Option<AudioBitRate>) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    /// Renders the argument vector passed after the executable path.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-window".to_string(),
            "--no-video".to_string(),
            "--audio-source=playback".to_string(),
            format!("--audio-buffer={}", self.buffer),
        ];
        if let Some(rate) = &self.bit_rate {
            args.push(format!("--audio-bit-rate={rate}"));
        }
        args.push(format!("--tcpip={}", self.endpoint));
        args
    }
}
