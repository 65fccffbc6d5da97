use crate::params::ChannelMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Remote fetch error: {0}")]
    Remote(String),

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("channel mode mismatch: requested {expected}, container declares {found}")]
    ModeMismatch {
        expected: ChannelMode,
        found: ChannelMode,
    },
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, VaultError>;
