//! Built-in lossless container: a fixed superblock, a CBOR manifest, then
//! `frame_count` frames of `width * height * 3` bytes each.

use super::{FrameReader, FrameWriter, MediaBackend, StreamInfo};
use crate::error::{Result, VaultError};
use crate::frame::FrameBuffer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use time::OffsetDateTime;
use tracing::{debug, warn};

pub const MAGIC: &[u8; 6] = b"VVAULT";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: u64 = 24;
pub const EXTENSION: &str = "vvr";

/// `frame_count` of a container whose writer never finished.
const UNSEALED: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub version: u16,
    /// Byte length of the manifest (CBOR)
    pub manifest_len: u64,
    pub frame_count: u64,
}

impl Superblock {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&self.manifest_len.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> std::io::Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "bad container magic",
            ));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        let mut buf8 = [0u8; 8];
        r.read_exact(&mut buf8)?;
        let manifest_len = u64::from_le_bytes(buf8);
        r.read_exact(&mut buf8)?;
        let frame_count = u64::from_le_bytes(buf8);
        Ok(Self {
            version,
            manifest_len,
            frame_count,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Meta {
    pub created: i64,
    pub tool: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Manifest {
    pub stream: StreamInfo,
    pub meta: Meta,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RawBackend {
    deterministic: bool,
}

impl RawBackend {
    pub fn new(deterministic: bool) -> Self {
        Self { deterministic }
    }
}

impl MediaBackend for RawBackend {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn extension(&self) -> &'static str {
        EXTENSION
    }

    fn create(&self, path: &Path, info: &StreamInfo) -> Result<Box<dyn FrameWriter>> {
        let created = if self.deterministic {
            0
        } else {
            OffsetDateTime::now_utc().unix_timestamp()
        };
        Ok(Box::new(RawWriter::create(path, info.clone(), created)?))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>> {
        Ok(Box::new(RawReader::open(path)?))
    }
}

pub struct RawWriter {
    out: BufWriter<File>,
    info: StreamInfo,
    manifest_len: u64,
    frames: u64,
    finished: bool,
}

impl RawWriter {
    pub fn create(path: &Path, info: StreamInfo, created: i64) -> Result<Self> {
        if FrameBuffer::checked_byte_len(info.width, info.height).is_none_or(|len| len == 0) {
            return Err(VaultError::Format(format!(
                "invalid geometry {}x{}",
                info.width, info.height
            )));
        }
        let manifest = Manifest {
            stream: info.clone(),
            meta: Meta {
                created,
                tool: concat!("vidvault-core/", env!("CARGO_PKG_VERSION")).to_string(),
            },
        };
        let mut manifest_buf = Vec::new();
        ciborium::ser::into_writer(&manifest, &mut manifest_buf)
            .map_err(|e| VaultError::Format(format!("manifest encode: {e}")))?;
        let manifest_len = manifest_buf.len() as u64;

        let mut out = BufWriter::new(File::create(path)?);
        Superblock {
            version: VERSION,
            manifest_len,
            frame_count: UNSEALED,
        }
        .write_to(&mut out)?;
        out.write_all(&manifest_buf)?;

        Ok(Self {
            out,
            info,
            manifest_len,
            frames: 0,
            finished: false,
        })
    }
}

impl FrameWriter for RawWriter {
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        if self.finished {
            return Err(VaultError::Media("write after finish".to_string()));
        }
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(VaultError::SizeMismatch {
                expected: FrameBuffer::byte_len(self.info.width, self.info.height),
                actual: frame.as_bytes().len(),
            });
        }
        self.out.write_all(frame.as_bytes())?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        // finalize superblock
        self.out.seek(SeekFrom::Start(0))?;
        Superblock {
            version: VERSION,
            manifest_len: self.manifest_len,
            frame_count: self.frames,
        }
        .write_to(&mut self.out)?;
        self.out.flush()?;
        debug!(frames = self.frames, "raw container sealed");
        Ok(())
    }
}

impl Drop for RawWriter {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!("raw container not sealed: {e}");
            }
        }
    }
}

pub struct RawReader {
    inner: BufReader<File>,
    info: StreamInfo,
    remaining: u64,
}

impl RawReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = File::open(path)?;
        let file_len = f.metadata()?.len();
        let sb = Superblock::read_from(&mut f)?;
        if sb.version != VERSION {
            return Err(VaultError::Format(format!(
                "unsupported container version {}",
                sb.version
            )));
        }

        let data_off = HEADER_LEN
            .checked_add(sb.manifest_len)
            .filter(|&off| off <= file_len)
            .ok_or_else(|| VaultError::Format("manifest exceeds file".to_string()))?;
        let mut man_buf = vec![0u8; sb.manifest_len as usize];
        f.read_exact(&mut man_buf)?;
        let manifest: Manifest = ciborium::de::from_reader(&man_buf[..])
            .map_err(|e| VaultError::Format(format!("manifest decode: {e}")))?;

        let info = manifest.stream;
        let frame_len = FrameBuffer::checked_byte_len(info.width, info.height)
            .filter(|&len| len > 0)
            .ok_or_else(|| {
                VaultError::Format(format!("invalid geometry {}x{}", info.width, info.height))
            })? as u64;

        let available = (file_len - data_off) / frame_len;
        let remaining = if sb.frame_count == UNSEALED {
            warn!(frames = available, "container was not sealed; reading complete frames");
            available
        } else if sb.frame_count > available {
            warn!(
                declared = sb.frame_count,
                available, "container truncated"
            );
            available
        } else {
            sb.frame_count
        };

        Ok(Self {
            inner: BufReader::new(f),
            info,
            remaining,
        })
    }
}

impl FrameReader for RawReader {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Result<Option<FrameBuffer>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let mut data = vec![0u8; FrameBuffer::byte_len(self.info.width, self.info.height)];
        self.inner.read_exact(&mut data)?;
        self.remaining -= 1;
        Ok(Some(FrameBuffer::from_raw(
            self.info.width,
            self.info.height,
            data,
        )?))
    }
}
