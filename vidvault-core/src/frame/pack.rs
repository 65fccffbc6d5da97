use super::FrameBuffer;
use crate::error::{Result, VaultError};
use crate::params::{CHANNELS, ChannelMode};

/// Lay one chunk onto a fresh frame, pixel `i` in row-major order.
///
/// Triple mode fills channels 0..3 from `chunk[i*3..i*3+3]`; single mode puts
/// `chunk[i]` in channel 0 and leaves channels 1 and 2 at zero.
pub fn pack(chunk: &[u8], width: u32, height: u32, mode: ChannelMode) -> Result<FrameBuffer> {
    if FrameBuffer::checked_byte_len(width, height).is_none() {
        return Err(VaultError::Format(format!(
            "invalid geometry: {width}x{height}"
        )));
    }
    let expected = width as usize * height as usize * mode.bytes_per_pixel();
    if chunk.len() != expected {
        return Err(VaultError::SizeMismatch {
            expected,
            actual: chunk.len(),
        });
    }

    let mut frame = FrameBuffer::new(width, height);

    match mode {
        ChannelMode::Triple => frame.as_bytes_mut().copy_from_slice(chunk),
        ChannelMode::Single => {
            for (px, &b) in frame.as_bytes_mut().chunks_exact_mut(CHANNELS).zip(chunk) {
                px[0] = b;
            }
        }
    }
    Ok(frame)
}

/// Inverse of [`pack`]; allocates a new chunk.
pub fn unpack(frame: &FrameBuffer, mode: ChannelMode) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(frame.pixel_count() * mode.bytes_per_pixel());
    unpack_into(frame, mode, &mut out)?;
    Ok(out)
}

/// Append the chunk carried by `frame` to `out`.
pub fn unpack_into(frame: &FrameBuffer, mode: ChannelMode, out: &mut Vec<u8>) -> Result<()> {
    let data = frame.as_bytes();
    let expected = FrameBuffer::byte_len(frame.width(), frame.height());
    if data.len() != expected {
        return Err(VaultError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }

    match mode {
        ChannelMode::Triple => out.extend_from_slice(data),
        ChannelMode::Single => out.extend(data.chunks_exact(CHANNELS).map(|px| px[0])),
    }
    Ok(())
}
