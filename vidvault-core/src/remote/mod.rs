use crate::error::{Result, VaultError};
use tempfile::TempPath;

#[cfg(feature = "remote")]
pub mod http;

#[cfg(feature = "remote")]
pub use http::HttpFetcher;

/// Quality tag tried first when picking a download format.
pub const PREFERRED_TAG: &str = "144p";

/// A remote resource locator is recognised by its scheme prefix only.
pub fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    pub tag: String,
    pub content_length: Option<u64>,
    pub url: String,
}

/// Smallest declared format among those tagged `preferred_tag`, or among all
/// formats when none carries the tag. Unknown lengths sort last.
pub fn select_format<'a>(
    formats: &'a [FormatInfo],
    preferred_tag: &str,
) -> Result<&'a FormatInfo> {
    let preferred: Vec<&FormatInfo> = formats
        .iter()
        .filter(|f| f.tag == preferred_tag)
        .collect();
    let candidates: Vec<&FormatInfo> = if preferred.is_empty() {
        formats.iter().collect()
    } else {
        preferred
    };
    candidates
        .into_iter()
        .min_by_key(|f| f.content_length.unwrap_or(u64::MAX))
        .ok_or_else(|| VaultError::Remote("no suitable video formats found".to_string()))
}

pub trait FormatCatalog {
    fn formats(&self, url: &str) -> Result<Vec<FormatInfo>>;
}

pub trait RemoteFetcher {
    /// Download `url` to a local temporary file, removed when the returned path drops.
    fn fetch(&self, url: &str) -> Result<TempPath>;
}

/// Fetcher used when the crate is built without network support.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRemote;

impl RemoteFetcher for NoRemote {
    fn fetch(&self, url: &str) -> Result<TempPath> {
        Err(VaultError::Remote(format!(
            "remote sources are not supported in this build: {url}"
        )))
    }
}
