//! Matroska + FFV1 backend. Frames travel as planar GBR so no lossy colour
//! conversion sits between the packer and the codec.

use super::{FrameReader, FrameWriter, MediaBackend, StreamInfo};
use crate::error::{Result, VaultError};
use crate::frame::FrameBuffer;
use crate::params::{CHANNELS, ChannelMode};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{Dictionary, Packet, Rational};
use std::path::Path;
use tracing::{debug, info, warn};

pub const EXTENSION: &str = "mkv";

const TAG_MODE: &str = "VIDVAULT_MODE";
const TAG_PAYLOAD_LEN: &str = "VIDVAULT_PAYLOAD_LEN";

/// GBRP plane holding each interleaved channel (plane 0 = G, 1 = B, 2 = R).
const PLANE_OF_CHANNEL: [usize; CHANNELS] = [1, 0, 2];

fn media_err(ctx: &str, e: ffmpeg_next::Error) -> VaultError {
    VaultError::Media(format!("{ctx}: {e}"))
}

pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Result<Self> {
        ffmpeg_next::init().map_err(|e| media_err("ffmpeg init", e))?;
        Ok(Self)
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn extension(&self) -> &'static str {
        EXTENSION
    }

    fn create(&self, path: &Path, info: &StreamInfo) -> Result<Box<dyn FrameWriter>> {
        Ok(Box::new(FfmpegWriter::create(path, info)?))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>> {
        Ok(Box::new(FfmpegReader::open(path)?))
    }
}

pub struct FfmpegWriter {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::encoder::Video,
    encoder_tb: Rational,
    stream_tb: Rational,
    width: u32,
    height: u32,
    pts: i64,
    finished: bool,
}

impl FfmpegWriter {
    pub fn create(path: &Path, info: &StreamInfo) -> Result<Self> {
        let mut octx =
            ffmpeg_next::format::output(&path).map_err(|e| media_err("create output", e))?;
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::FFV1)
            .ok_or_else(|| VaultError::Media("FFV1 encoder not available".to_string()))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let time_base = Rational::new(1, info.fps as i32);
        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| media_err("encoder context", e))?;
        encoder.set_width(info.width);
        encoder.set_height(info.height);
        encoder.set_format(Pixel::GBRP);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(Rational::new(info.fps as i32, 1)));
        if global_header {
            encoder.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder
            .open_as(codec)
            .map_err(|e| media_err("open FFV1 encoder", e))?;

        {
            let mut ost = octx
                .add_stream(codec)
                .map_err(|e| media_err("add stream", e))?;
            ost.set_parameters(&encoder);
            ost.set_time_base(time_base);
        }

        let mut tags = Dictionary::new();
        if let Some(mode) = info.mode {
            tags.set(TAG_MODE, &mode.to_string());
        }
        if let Some(len) = info.payload_len {
            tags.set(TAG_PAYLOAD_LEN, &len.to_string());
        }
        octx.set_metadata(tags);
        octx.write_header()
            .map_err(|e| media_err("write header", e))?;

        let stream_tb = octx
            .stream(0)
            .map(|s| s.time_base())
            .unwrap_or(time_base);
        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            "FFV1 encoder initialized"
        );

        Ok(Self {
            octx,
            encoder,
            encoder_tb: time_base,
            stream_tb,
            width: info.width,
            height: info.height,
            pts: 0,
            finished: false,
        })
    }

    fn drain(&mut self) -> Result<()> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.encoder_tb, self.stream_tb);
            encoded
                .write_interleaved(&mut self.octx)
                .map_err(|e| media_err("write packet", e))?;
        }
        Ok(())
    }
}

impl FrameWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        if self.finished {
            return Err(VaultError::Media("write after finish".to_string()));
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(VaultError::SizeMismatch {
                expected: FrameBuffer::byte_len(self.width, self.height),
                actual: frame.as_bytes().len(),
            });
        }

        let mut out = VideoFrame::new(Pixel::GBRP, self.width, self.height);
        let w = self.width as usize;
        for (ch, &plane) in PLANE_OF_CHANNEL.iter().enumerate() {
            let stride = out.stride(plane);
            let dst = out.data_mut(plane);
            for (y, row) in frame.as_bytes().chunks_exact(w * CHANNELS).enumerate() {
                let line = &mut dst[y * stride..y * stride + w];
                for (d, px) in line.iter_mut().zip(row.chunks_exact(CHANNELS)) {
                    *d = px[ch];
                }
            }
        }
        out.set_pts(Some(self.pts));
        self.pts += 1;

        self.encoder
            .send_frame(&out)
            .map_err(|e| media_err("send frame", e))?;
        self.drain()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.encoder
            .send_eof()
            .map_err(|e| media_err("send eof", e))?;
        self.drain()?;
        self.octx
            .write_trailer()
            .map_err(|e| media_err("write trailer", e))?;
        debug!(frames = self.pts, "matroska container finalized");
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!("matroska container not finalized: {e}");
            }
        }
    }
}

pub struct FfmpegReader {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<scaling::Context>,
    stream_index: usize,
    info: StreamInfo,
    eof_sent: bool,
    drained: bool,
}

impl FfmpegReader {
    pub fn open(path: &Path) -> Result<Self> {
        let ictx = ffmpeg_next::format::input(&path).map_err(|e| media_err("open input", e))?;
        let (stream_index, parameters, rate) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| VaultError::Media("no video stream".to_string()))?;
            (stream.index(), stream.parameters(), stream.avg_frame_rate())
        };
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .map_err(|e| media_err("decoder context", e))?
            .decoder()
            .video()
            .map_err(|e| media_err("open decoder", e))?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = if decoder.format() == Pixel::GBRP {
            None
        } else {
            warn!(
                format = ?decoder.format(),
                "source is not planar GBR; converting, data may not round-trip"
            );
            Some(
                scaling::Context::get(
                    decoder.format(),
                    width,
                    height,
                    Pixel::GBRP,
                    width,
                    height,
                    scaling::Flags::POINT,
                )
                .map_err(|e| media_err("scaler", e))?,
            )
        };

        let tags = ictx.metadata();
        let mode = tags.get(TAG_MODE).and_then(|m| m.parse::<ChannelMode>().ok());
        let payload_len = tags
            .get(TAG_PAYLOAD_LEN)
            .and_then(|l| l.parse::<u64>().ok());
        let fps = if rate.denominator() > 0 {
            (rate.numerator() / rate.denominator()).max(0) as u32
        } else {
            0
        };

        Ok(Self {
            info: StreamInfo {
                width,
                height,
                fps,
                mode,
                payload_len,
            },
            ictx,
            decoder,
            scaler,
            stream_index,
            eof_sent: false,
            drained: false,
        })
    }

    fn to_frame_buffer(&mut self, decoded: &VideoFrame) -> Result<FrameBuffer> {
        let mut converted = VideoFrame::empty();
        let planar = match self.scaler.as_mut() {
            Some(scaler) => {
                scaler
                    .run(decoded, &mut converted)
                    .map_err(|e| media_err("convert frame", e))?;
                &converted
            }
            None => decoded,
        };

        let (w, h) = (planar.width(), planar.height());
        let mut frame = FrameBuffer::new(w, h);
        let w = w as usize;
        for (ch, &plane) in PLANE_OF_CHANNEL.iter().enumerate() {
            let stride = planar.stride(plane);
            let src = planar.data(plane);
            for (y, row) in frame.as_bytes_mut().chunks_exact_mut(w * CHANNELS).enumerate() {
                let line = &src[y * stride..y * stride + w];
                for (px, &s) in row.chunks_exact_mut(CHANNELS).zip(line) {
                    px[ch] = s;
                }
            }
        }
        Ok(frame)
    }
}

impl FrameReader for FfmpegReader {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Result<Option<FrameBuffer>> {
        let mut decoded = VideoFrame::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.to_frame_buffer(&decoded).map(Some);
            }
            if self.drained {
                return Ok(None);
            }
            if self.eof_sent {
                self.drained = true;
                continue;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| media_err("send packet", e))?;
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| media_err("send eof", e))?;
                    self.eof_sent = true;
                }
                Err(e) => return Err(media_err("read packet", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DecodeOptions, EncodeParams};
    use crate::transcode::{decode_file, encode_file};

    fn stream(w: u32, h: u32) -> StreamInfo {
        StreamInfo {
            width: w,
            height: h,
            fps: 30,
            mode: Some(ChannelMode::Triple),
            payload_len: Some(42),
        }
    }

    fn params(mode: ChannelMode) -> EncodeParams {
        EncodeParams {
            width: 16,
            height: 8,
            fps: 30,
            mode,
        }
    }

    #[test]
    fn planes_carry_each_channel_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planes.mkv");
        let backend = FfmpegBackend::new().unwrap();
        let frames: Vec<FrameBuffer> = (0..3u8)
            .map(|seed| {
                let data = (0..FrameBuffer::byte_len(16, 8))
                    .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                    .collect();
                FrameBuffer::from_raw(16, 8, data).unwrap()
            })
            .collect();
        {
            let mut w = backend.create(&path, &stream(16, 8)).unwrap();
            for f in &frames {
                w.write_frame(f).unwrap();
            }
            w.finish().unwrap();
        }

        let mut r = backend.open(&path).unwrap();
        assert_eq!((r.info().width, r.info().height), (16, 8));
        assert_eq!(r.info().mode, Some(ChannelMode::Triple));
        assert_eq!(r.info().payload_len, Some(42));
        for expected in &frames {
            assert_eq!(r.read_frame().unwrap().as_ref(), Some(expected));
        }
        assert_eq!(r.read_frame().unwrap(), None);
    }

    #[test]
    fn file_round_trip_in_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new().unwrap();
        // Not a multiple of either chunk size, so the last frame is padded.
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
        let input = dir.path().join("in.bin");
        std::fs::write(&input, &data).unwrap();

        for mode in [ChannelMode::Triple, ChannelMode::Single] {
            let container = dir.path().join(format!("{mode}.mkv"));
            let output = dir.path().join(format!("{mode}.decoded"));
            let p = params(mode);
            let frames = encode_file(&input, &container, &p, &backend).unwrap();
            assert_eq!(frames as usize, data.len().div_ceil(p.chunk_size()));

            let n = decode_file(&container, &output, &DecodeOptions::default(), &backend).unwrap();
            assert_eq!(n as usize, data.len());
            assert_eq!(std::fs::read(&output).unwrap(), data);
        }
    }

    #[test]
    fn empty_input_round_trips_to_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new().unwrap();
        let input = dir.path().join("empty");
        let container = dir.path().join("empty.mkv");
        let output = dir.path().join("empty.decoded");
        std::fs::write(&input, b"").unwrap();

        let frames = encode_file(&input, &container, &params(ChannelMode::Triple), &backend)
            .unwrap();
        assert_eq!(frames, 0);
        let n = decode_file(&container, &output, &DecodeOptions::default(), &backend).unwrap();
        assert_eq!(n, 0);
        assert!(std::fs::read(&output).unwrap().is_empty());
    }

    #[test]
    fn declared_mode_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new().unwrap();
        let input = dir.path().join("in.bin");
        let container = dir.path().join("in.mkv");
        std::fs::write(&input, b"single").unwrap();
        encode_file(&input, &container, &params(ChannelMode::Single), &backend).unwrap();

        let opts = DecodeOptions {
            mode: Some(ChannelMode::Triple),
            ..Default::default()
        };
        let err = decode_file(&container, &dir.path().join("out"), &opts, &backend).unwrap_err();
        assert!(matches!(err, VaultError::ModeMismatch { .. }));
    }
}
