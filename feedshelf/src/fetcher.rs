use crate::parser::FeedParser;
use crate::types::{AggregatorError, FetchConfig, FetchOutcome, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{FetchValidators, ValidatorToken};
use reqwest::header::{HeaderMap, HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::{Client, Response, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Conditional fetch of one feed URL.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&ValidatorToken>,
        last_modified: Option<&str>,
    ) -> Result<FetchOutcome>;
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    async fn send(
        &self,
        url: &str,
        etag: Option<&ValidatorToken>,
        last_modified: Option<&str>,
    ) -> Result<FetchOutcome> {
        let mut request = self.client.get(url);

        if let Some(etag) = etag.filter(|etag| !etag.is_empty()) {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }

        if let Some(since) = last_modified.and_then(if_modified_since) {
            request = request.header(IF_MODIFIED_SINCE, since);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            debug!("Feed not modified: {}", url);
            return Ok(FetchOutcome::Unchanged);
        }

        if !status.is_success() {
            return Err(AggregatorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let validators = validators_from(response.headers());
        let body = read_body(response, self.config.max_body_bytes()).await?;
        let feed = FeedParser::parse_feed(&body)?;

        info!(
            "Fetched feed {} ({} bytes, {} entries)",
            url,
            body.len(),
            feed.entries.len()
        );

        Ok(FetchOutcome::Fetched { feed, validators })
    }
}

#[async_trait]
impl FeedFetcher for Fetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&ValidatorToken>,
        last_modified: Option<&str>,
    ) -> Result<FetchOutcome> {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.timeout_seconds);

        // The client timeout covers the transfer; this one also bounds parsing.
        let outcome = tokio::time::timeout(deadline, self.send(url, etag, last_modified))
            .await
            .map_err(|_| AggregatorError::Timeout {
                url: url.to_string(),
                seconds: self.config.timeout_seconds,
            })?;

        debug!("Fetch of {} took {:?}", url, started.elapsed());
        outcome
    }
}

/// Buffers a response body, failing once it grows past `limit` bytes.
/// A declared `Content-Length` over the limit fails before reading anything.
pub(crate) async fn read_body(mut response: Response, limit: usize) -> Result<Vec<u8>> {
    let too_large = |response: &Response| AggregatorError::BodyTooLarge {
        url: response.url().to_string(),
        limit_bytes: limit,
    };

    if response
        .content_length()
        .is_some_and(|declared| declared > limit as u64)
    {
        return Err(too_large(&response));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(too_large(&response));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn validators_from(headers: &HeaderMap) -> FetchValidators {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    FetchValidators {
        etag: ValidatorToken::new(header(ETAG)),
        last_modified: header(LAST_MODIFIED),
    }
}

/// Re-renders a stored `Last-Modified` value as an IMF-fixdate.
/// Values that do not parse as an HTTP date are not sent at all.
pub fn if_modified_since(last_modified: &str) -> Option<String> {
    let trimmed = last_modified.trim();
    if trimmed.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(trimmed)
        .ok()
        .map(|dt| {
            dt.with_timezone(&Utc)
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string()
        })
}
