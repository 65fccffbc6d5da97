use crate::error::Result;
use crate::frame::FrameBuffer;
use crate::params::ChannelMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stream-level parameters a container is created with, and reports back on open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Channel variant used to encode; absent for foreign videos.
    pub mode: Option<ChannelMode>,
    /// Length of the data before padding; absent for foreign videos.
    pub payload_len: Option<u64>,
}

pub trait FrameWriter {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()>;

    /// Flush and release the container. Calling it twice is a no-op.
    fn finish(&mut self) -> Result<()>;
}

pub trait FrameReader {
    fn info(&self) -> &StreamInfo;

    /// Next frame in stream order, `None` once exhausted.
    fn read_frame(&mut self) -> Result<Option<FrameBuffer>>;
}

pub trait MediaBackend {
    fn name(&self) -> &'static str;

    /// Container file extension, without the dot.
    fn extension(&self) -> &'static str;

    fn create(&self, path: &Path, info: &StreamInfo) -> Result<Box<dyn FrameWriter>>;

    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>>;
}

/// Lazy, single-pass view of a reader's frames. Ends at the first `None` or empty frame.
pub struct Frames<'a> {
    reader: &'a mut dyn FrameReader,
    done: bool,
}

impl<'a> Frames<'a> {
    pub fn new(reader: &'a mut dyn FrameReader) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl Iterator for Frames<'_> {
    type Item = Result<FrameBuffer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_frame() {
            Ok(Some(f)) if !f.is_empty() => Some(Ok(f)),
            Ok(_) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Raw,
    Ffmpeg,
}

/// `deterministic` zeroes creation timestamps where the container records one.
pub fn open_backend(backend: Backend, deterministic: bool) -> Result<Box<dyn MediaBackend>> {
    match backend {
        Backend::Raw => Ok(Box::new(raw::RawBackend::new(deterministic))),
        #[cfg(feature = "ffmpeg")]
        Backend::Ffmpeg => Ok(Box::new(ffmpeg::FfmpegBackend::new()?)),
        #[cfg(not(feature = "ffmpeg"))]
        Backend::Ffmpeg => Err(crate::error::VaultError::Media(
            "built without the `ffmpeg` feature".to_string(),
        )),
    }
}

pub mod raw;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
