use crate::chunking::chunker::{chunk, chunk_count, padding_len};
use crate::domain::{JobKind, TranscodeJob};
use crate::error::{Result, VaultError};
use crate::frame::{FrameBuffer, pack, unpack_into};
use crate::media::{FrameWriter, Frames, MediaBackend, StreamInfo};
use crate::params::{ChannelMode, DecodeOptions, EncodeParams};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Pack `data` into the ordered frames that carry it. Empty input gives no frames.
pub fn encode_frames(data: &[u8], params: &EncodeParams) -> Result<Vec<FrameBuffer>> {
    params.validate()?;
    chunk(data, params.chunk_size())
        .iter()
        .map(|c| pack(c, params.width, params.height, params.mode))
        .collect()
}

/// Concatenate the chunks carried by `frames`, padding included.
pub fn decode_frames<I>(frames: I, mode: ChannelMode) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Result<FrameBuffer>>,
{
    let mut out = Vec::new();
    for frame in frames {
        unpack_into(&frame?, mode, &mut out)?;
    }
    Ok(out)
}

fn write_all_frames(
    writer: &mut dyn FrameWriter,
    data: &[u8],
    params: &EncodeParams,
) -> Result<u64> {
    let mut written = 0u64;
    for (i, c) in chunk(data, params.chunk_size()).iter().enumerate() {
        let frame = pack(c, params.width, params.height, params.mode)?;
        writer.write_frame(&frame).map_err(|e| match e {
            VaultError::Media(m) => VaultError::Media(format!("error writing frame {i}: {m}")),
            other => other,
        })?;
        written += 1;
    }
    Ok(written)
}

/// Encode one file into a fresh container at `output`.
///
/// The writer is finished on success; on a write error it is still released
/// when dropped, which may leave a truncated container behind.
pub fn encode_file(
    input: &Path,
    output: &Path,
    params: &EncodeParams,
    backend: &dyn MediaBackend,
) -> Result<u64> {
    params.validate()?;
    let data = fs::read(input)?;
    let frames = chunk_count(data.len(), params.chunk_size());
    debug!(
        input = %input.display(),
        bytes = data.len(),
        frames,
        padding = padding_len(data.len(), params.chunk_size()),
        "encoding"
    );

    let info = StreamInfo {
        width: params.width,
        height: params.height,
        fps: params.fps,
        mode: Some(params.mode),
        payload_len: Some(data.len() as u64),
    };
    let mut writer = backend.create(output, &info)?;
    let written = write_all_frames(writer.as_mut(), &data, params)?;
    writer.finish()?;
    info!(frames = written, backend = backend.name(), "encoded {}", input.display());
    Ok(written)
}

fn resolve_mode(
    requested: Option<ChannelMode>,
    declared: Option<ChannelMode>,
) -> Result<ChannelMode> {
    match (requested, declared) {
        (Some(r), Some(d)) if r != d => Err(VaultError::ModeMismatch {
            expected: r,
            found: d,
        }),
        (Some(r), _) => Ok(r),
        (None, Some(d)) => Ok(d),
        (None, None) => Ok(ChannelMode::default()),
    }
}

/// Decode a container back into `output`, returning the number of bytes written.
///
/// When the container records the payload length the zero padding is dropped,
/// unless `opts.keep_padding` is set.
pub fn decode_file(
    source: &Path,
    output: &Path,
    opts: &DecodeOptions,
    backend: &dyn MediaBackend,
) -> Result<u64> {
    let mut reader = backend.open(source)?;
    let info = reader.info().clone();
    let mode = resolve_mode(opts.mode, info.mode)?;

    let mut data = decode_frames(Frames::new(reader.as_mut()), mode)?;
    drop(reader);

    match info.payload_len {
        Some(len) if !opts.keep_padding => {
            let len = usize::try_from(len)
                .map_err(|_| VaultError::Format(format!("payload length {len} too large")))?;
            if len > data.len() {
                warn!(
                    declared = len,
                    decoded = data.len(),
                    "container holds fewer bytes than declared"
                );
            } else {
                data.truncate(len);
            }
        }
        _ => {}
    }

    fs::write(output, &data)?;
    info!(bytes = data.len(), %mode, "decoded {}", source.display());
    Ok(data.len() as u64)
}

/// Run one job in the direction its kind names.
pub fn run_job(job: &TranscodeJob, backend: &dyn MediaBackend) -> Result<u64> {
    match &job.kind {
        JobKind::Encode(params) => encode_file(&job.input, &job.output, params, backend),
        JobKind::Decode(opts) => decode_file(&job.input, &job.output, opts, backend),
    }
}
