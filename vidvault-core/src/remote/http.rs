use super::{FormatCatalog, FormatInfo, PREFERRED_TAG, RemoteFetcher, select_format};
use crate::error::{Result, VaultError};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use std::io::{BufWriter, Write};
use tempfile::TempPath;
use tracing::{debug, info, warn};

const COPY_BUF: usize = 1024 * 1024;

fn remote_err(ctx: &str, e: impl std::fmt::Display) -> VaultError {
    VaultError::Remote(format!("{ctx}: {e}"))
}

/// Direct-link fetcher: every URL exposes exactly one format, the resource itself.
pub struct HttpFetcher {
    client: Client,
    suffix: String,
}

impl HttpFetcher {
    /// `extension` names the temporary file so container probing sees the right suffix.
    pub fn new(extension: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vidvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| remote_err("http client", e))?;
        Ok(Self {
            client,
            suffix: format!(".{extension}"),
        })
    }
}

/// The single format of a direct link. Without response headers the length is
/// unknown and the link itself is used.
fn direct_format(url: &str, headers: Option<&HeaderMap>) -> FormatInfo {
    let content_length = headers
        .and_then(|h| h.get(CONTENT_LENGTH))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    FormatInfo {
        tag: "direct".to_string(),
        content_length,
        url: url.to_string(),
    }
}

impl FormatCatalog for HttpFetcher {
    /// A failed HEAD only costs the length hint; the GET decides whether the
    /// link is usable.
    fn formats(&self, url: &str) -> Result<Vec<FormatInfo>> {
        let format = match self.client.head(url).send().and_then(|r| r.error_for_status()) {
            Ok(resp) => direct_format(resp.url().as_str(), Some(resp.headers())),
            Err(e) => {
                warn!("video lookup failed, fetching directly: {e}");
                direct_format(url, None)
            }
        };
        Ok(vec![format])
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<TempPath> {
        let formats = self.formats(url)?;
        let format = select_format(&formats, PREFERRED_TAG)?;
        debug!(tag = %format.tag, length = ?format.content_length, "selected format");

        let mut resp = self
            .client
            .get(&format.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| remote_err("video stream", e))?;

        let tmp = tempfile::Builder::new()
            .prefix("vidvault-")
            .suffix(&self.suffix)
            .tempfile()
            .map_err(|e| remote_err("temp file", e))?;
        // TempPath removes the file when dropped, including on a failed copy.
        let (file, path) = tmp.into_parts();
        let mut out = BufWriter::with_capacity(COPY_BUF, file);
        let copied = std::io::copy(&mut resp, &mut out)
            .and_then(|n| out.flush().map(|_| n))
            .map_err(|e| remote_err("download", e))?;
        info!(bytes = copied, path = %path.display(), "downloaded remote video");
        Ok(path)
    }
}
