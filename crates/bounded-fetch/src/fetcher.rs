//! Upstream retrieval with a content-type gate and a byte ceiling

use crate::error::{FetchError, Result};
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE, HOST};
use reqwest::Client;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use url::Url;

/// Size of each body read
pub const CHUNK_SIZE: usize = 1024;

/// Default body ceiling (100 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Limits applied to every upstream fetch
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_bytes: u64,
    /// Whole-request deadline, connection through last body byte
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for pulling JPEG sources from upstream hosts
pub struct BoundedFetcher {
    client: Client,
    config: FetchConfig,
}

impl BoundedFetcher {
    /// Create a fetcher with the given limits
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// GET `url`, forwarding `headers`, and return the JPEG body.
    ///
    /// The inbound `Host` header names this proxy, so it is replaced by the
    /// upstream's own; every other header is passed through untouched.
    pub async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Vec<u8>> {
        let mut forwarded = headers.clone();
        forwarded.remove(HOST);

        debug!(url = %url, headers = forwarded.len(), "Fetching upstream image");

        let response = self
            .client
            .get(url.clone())
            .headers(forwarded)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Upstream returned error status");
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_jpeg(&content_type) {
            warn!(url = %url, content_type = %content_type, "Rejecting non-JPEG upstream response");
            return Err(FetchError::UnsupportedMedia(content_type));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.config.max_bytes {
                warn!(url = %url, declared, limit = self.config.max_bytes, "Declared length over limit");
                return Err(FetchError::TooLarge {
                    limit: self.config.max_bytes,
                });
            }
        }

        let stream = response.bytes_stream().map_err(|e| {
            if e.is_timeout() {
                io::Error::new(io::ErrorKind::TimedOut, e)
            } else {
                io::Error::other(e)
            }
        });
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);

        let body = read_capped(reader, self.config.max_bytes).await?;
        info!(url = %url, size = body.len(), "JPEG image received");
        Ok(body)
    }
}

/// Drain `reader` in [`CHUNK_SIZE`] reads, failing once the running total
/// would pass `max_bytes`.
///
/// The buffer never grows past `max_bytes`; the chunk that would overflow it
/// is dropped before the error is returned.
pub async fn read_capped<R>(mut reader: R, max_bytes: u64) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(FetchError::Timeout),
            Err(e) => return Err(FetchError::BodyRead(Box::new(e))),
        };

        if body.len() as u64 + read as u64 > max_bytes {
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Ok(body)
}

fn is_jpeg(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("image/jpeg")
}
