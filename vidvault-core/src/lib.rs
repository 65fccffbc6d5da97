#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod params;

pub mod chunking {
    pub mod chunker;
}

pub mod frame;
pub mod media;
pub mod remote;

pub mod batch;
pub mod transcode;

// Re-exports: stable API surface
pub use batch::{run_decode, run_encode};
pub use domain::{BatchReport, JobKind, JobOutcome, TranscodeJob};
pub use params::{BatchOptions, ChannelMode, DecodeOptions, EncodeParams};
pub use transcode::{decode_file, decode_frames, encode_file, encode_frames, run_job};
