// vidvault_core/src/domain.rs
use crate::params::{DecodeOptions, EncodeParams};
use std::path::PathBuf;

/// Direction of a job, with the settings that direction reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    Encode(EncodeParams),
    Decode(DecodeOptions),
}

/// One input/output pair handed from the batch driver to the transcoder.
#[derive(Clone, Debug)]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: JobKind,
}

#[derive(Clone, Debug)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<JobOutcome>,
    /// Skipped items with the rendered error.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
