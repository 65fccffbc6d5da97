use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vidvault_core::ChannelMode;
use vidvault_core::media::Backend;
use vidvault_core::params::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Parser)]
#[command(author, version, about = "Store files losslessly as video frames", long_about = None)]
pub struct Cli {
    /// Container backend
    #[arg(long, value_enum, default_value_t = BackendArg::Raw, global = true)]
    pub backend: BackendArg,

    /// Debug-level logging (overridden by VIDVAULT_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Built-in frame container (.vvr)
    Raw,
    /// FFV1 in Matroska (.mkv), needs the `ffmpeg` feature
    Ffmpeg,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Raw => Backend::Raw,
            BackendArg::Ffmpeg => Backend::Ffmpeg,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// 1 byte per pixel, channels 1 and 2 zeroed
    Single,
    /// 3 bytes per pixel
    Triple,
}

impl From<ModeArg> for ChannelMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Single => ChannelMode::Single,
            ModeArg::Triple => ChannelMode::Triple,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// File or directory to encode
    pub input: PathBuf,
    /// Directory receiving the containers (created if absent)
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,
    #[arg(long, value_enum, default_value_t = ModeArg::Triple)]
    pub mode: ModeArg,

    /// Process directory entries in file-name order
    #[arg(long)]
    pub sorted: bool,
    /// Zero timestamps in container metadata
    #[arg(long)]
    pub deterministic: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Container file, directory of containers, or http(s) URL
    pub input: String,
    /// Directory receiving decoded files (created if absent)
    pub out_dir: PathBuf,

    /// Channel mode used at encode time; defaults to what the container declares
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Keep the trailing zero padding of the last frame
    #[arg(long)]
    pub keep_padding: bool,

    /// Process directory entries in file-name order
    #[arg(long)]
    pub sorted: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a file or every file of a directory into video containers
    Encode(EncodeArgs),

    /// Decode a container, a directory of containers, or a URL back into files
    Decode(DecodeArgs),
}
