use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, CONTENT_ENCODING, CONTENT_LENGTH};
use reqwest::Client;
use std::future::Future;
use std::io::Read;
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// Raw body of one GET plus the size the server declared for it.
#[derive(Debug, Clone)]
pub struct Payload {
    /// `Content-Length` exactly as sent, before any content decoding.
    pub content_length: Option<u64>,
    /// Body arrived with `Content-Encoding: gzip`.
    pub gzipped: bool,
    pub body: Bytes,
}

impl Payload {
    /// Declared size, a missing header counting as zero.
    pub fn declared_len(&self) -> u64 {
        self.content_length.unwrap_or(0)
    }

    /// The body with any gzip content encoding removed.
    pub fn into_body(self) -> Result<Bytes> {
        if !self.gzipped {
            return Ok(self.body);
        }
        let mut out = Vec::new();
        GzDecoder::new(&self.body[..])
            .read_to_end(&mut out)
            .context("gunzipping response body")?;
        Ok(Bytes::from(out))
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn is_gzipped(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false)
}

/// Something that can retrieve one locator.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Payload, FetchError>> + Send;
}

/// `reqwest`-backed fetcher with a per-request timeout.
///
/// The client never decodes bodies itself: reqwest drops `Content-Length`
/// when it does, and the empty-file check needs the declared size.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_gzip()
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Payload, FetchError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let content_length = declared_length(resp.headers());
        let gzipped = is_gzipped(resp.headers());
        // skip reading what would be discarded anyway
        if content_length.unwrap_or(0) == 0 {
            return Ok(Payload {
                content_length,
                gzipped,
                body: Bytes::new(),
            });
        }
        let body = resp.bytes().await?;
        Ok(Payload {
            content_length,
            gzipped,
            body,
        })
    }
}

/// Last non-empty path segment of `url`, used as the local file name.
pub fn file_name(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("parsing locator {}", url))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .with_context(|| format!("locator {} has no file name", url))
}
