use crate::error::{Result, VaultError};
use crate::params::CHANNELS;

pub mod pack;

pub use pack::{pack, unpack, unpack_into};

/// A `height x width` grid of 8-bit pixels, three interleaved channels each,
/// stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; Self::byte_len(width, height)],
        }
    }

    /// Wrap already-interleaved channel data.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::checked_byte_len(width, height).ok_or_else(|| {
            VaultError::Format(format!("invalid geometry: {width}x{height}"))
        })?;
        if data.len() != expected {
            return Err(VaultError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer length for a geometry that is already known to fit in memory,
    /// i.e. one taken from an existing frame or from validated parameters.
    #[inline]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    /// Buffer length for an untrusted geometry; `None` when it overflows `usize`.
    pub fn checked_byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(CHANNELS)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// An empty frame terminates a frame sequence.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channel values of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; CHANNELS] {
        let off = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[off], self.data[off + 1], self.data[off + 2]]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
