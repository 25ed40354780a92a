use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{RangeSource, check_range, range_len};
use crate::error::{Result, SziError};

/// Transport settings for [`HttpRangeSource`]
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts allowed for timed out or refused connections
    pub max_retry: u32,
    /// Extra headers sent with the HEAD request and every range request
    pub headers: HeaderMap,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retry: 10,
            headers: HeaderMap::new(),
        }
    }
}

/// HTTP Range source for remote archives
pub struct HttpRangeSource {
    client: Client,
    url: String,
    size: u64,
    headers: HeaderMap,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeSource {
    /// Create a new HTTP Range source with default options
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub async fn new(url: String) -> Result<Self> {
        Self::with_options(url, HttpOptions::default()).await
    }

    pub async fn with_options(url: String, options: HttpOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;

        let resp = client
            .head(&url)
            .headers(options.headers.clone())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SziError::HttpStatus(resp.status()));
        }

        let accept_ranges = resp
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            return Err(SziError::RangeNotSupported);
        }

        let size = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or(SziError::MissingContentLength)?;

        debug!("{url}: {size} bytes, range requests supported");

        Ok(Self {
            client,
            url,
            size,
            headers: options.headers,
            transferred_bytes: AtomicU64::new(0),
            max_retry: options.max_retry,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let expected_size = range_len(start, end)?;
        let mut buf = Vec::with_capacity(expected_size);
        let mut retry_count = 0;

        // Servers may answer with less than requested; ask again for the rest
        while buf.len() < expected_size {
            let current_start = start + buf.len() as u64;
            // The header's end is inclusive
            let range = format!("bytes={}-{}", current_start, end - 1);

            let result = self
                .client
                .get(&self.url)
                .headers(self.headers.clone())
                .header(RANGE, &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(SziError::HttpStatus(resp.status()));
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        return Err(SziError::ShortRead {
                            expected: expected_size as u64,
                            actual: buf.len() as u64,
                        });
                    }
                    let chunk_len = bytes.len().min(expected_size - buf.len());
                    buf.extend_from_slice(&bytes[..chunk_len]);

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(e.into());
                    }
                    warn!(
                        "Connection error, retry {}/{}: {}",
                        retry_count, self.max_retry, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(buf)
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    fn size(&self) -> u64 {
        self.size
    }

    async fn fetch_range(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        check_range(start, end, self.size)?;
        if start == end {
            return Ok(Vec::new());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SziError::Cancelled),
            result = self.fetch(start, end) => result,
        }
    }
}
