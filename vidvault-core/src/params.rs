use crate::error::{Result, VaultError};
use crate::frame::FrameBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_FPS: u32 = 30;

/// Channels per pixel in every frame buffer, regardless of mode.
pub const CHANNELS: usize = 3;

/// How chunk bytes are laid onto a pixel's three channels.
///
/// The two variants are not interchangeable: a container encoded with one
/// must be decoded with the same one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// One data byte per pixel in channel 0; channels 1 and 2 are zero.
    Single,
    /// Three data bytes per pixel, one per channel.
    #[default]
    Triple,
}

impl ChannelMode {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ChannelMode::Single => 1,
            ChannelMode::Triple => 3,
        }
    }

    pub fn from_bytes_per_pixel(bpp: usize) -> Option<Self> {
        match bpp {
            1 => Some(ChannelMode::Single),
            3 => Some(ChannelMode::Triple),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Single => f.write_str("single"),
            ChannelMode::Triple => f.write_str("triple"),
        }
    }
}

impl FromStr for ChannelMode {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "1" => Ok(ChannelMode::Single),
            "triple" | "3" => Ok(ChannelMode::Triple),
            other => Err(VaultError::Format(format!("unknown channel mode: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mode: ChannelMode,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            mode: ChannelMode::default(),
        }
    }
}

impl EncodeParams {
    /// Rejects zero dimensions or rate, and frames too large to address.
    pub fn validate(&self) -> Result<()> {
        let addressable = FrameBuffer::checked_byte_len(self.width, self.height).is_some();
        if self.width == 0 || self.height == 0 || self.fps == 0 || !addressable {
            return Err(VaultError::Format(format!(
                "invalid geometry: {}x{} @ {} fps",
                self.width, self.height, self.fps
            )));
        }
        Ok(())
    }

    pub fn pixels_per_frame(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Bytes of payload carried by one frame. Only meaningful once
    /// [`validate`](Self::validate) has passed.
    pub fn chunk_size(&self) -> usize {
        self.pixels_per_frame()
            .saturating_mul(self.mode.bytes_per_pixel())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Requested variant. `None` trusts the container (or falls back to triple).
    pub mode: Option<ChannelMode>,
    /// Keep trailing zero padding even when the container records the payload length.
    pub keep_padding: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Sort directory entries by file name instead of using listing order.
    pub sorted: bool,
    /// Zero the creation timestamp in container metadata.
    pub deterministic: bool,
}
