#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedshelf::{
    AggregatorError, Collaborators, EnrichmentTask, ExtractedPage, FeedFetcher, FetchOutcome,
    LinkExtractor, ParsedEntry, ParsedFeed, Result,
};
use interfaces::{
    Archiver, FeedItemConverter, FeedItemId, FetchValidators, LinkId, Summarizer, ValidatorToken,
};
use tokio::sync::{Notify, Semaphore};
use url::Url;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn entry(guid: &str, published_at: Option<DateTime<Utc>>) -> ParsedEntry {
    ParsedEntry {
        guid: guid.to_string(),
        url: format!("https://example.com/{}", guid),
        title: format!("Item {}", guid),
        description: None,
        published_at,
    }
}

pub fn parsed(entries: Vec<ParsedEntry>) -> ParsedFeed {
    ParsedFeed {
        title: Some("Example feed".to_string()),
        description: Some("Things happen".to_string()),
        image_url: None,
        entries,
    }
}

pub fn validators(etag: &str, last_modified: &str) -> FetchValidators {
    FetchValidators {
        etag: ValidatorToken::new(etag),
        last_modified: last_modified.to_string(),
    }
}

/// RSS 2.0 document with one `<item>` per (guid, pubDate).
pub fn rss(items: &[(&str, Option<DateTime<Utc>>)]) -> String {
    let items: String = items
        .iter()
        .map(|(guid, published)| {
            let date = published
                .map(|d| format!("<pubDate>{}</pubDate>", d.to_rfc2822()))
                .unwrap_or_default();
            format!(
                "<item><title>Item {guid}</title><link>https://example.com/{guid}</link>\
                 <guid isPermaLink=\"false\">{guid}</guid>{date}</item>"
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example feed</title>
    <link>https://example.com</link>
    <description>Things happen</description>
    {items}
  </channel>
</rss>"#
    )
}

/// What `FakeFetcher` answers for one URL.
#[derive(Clone)]
pub enum Reply {
    Feed(ParsedFeed, FetchValidators),
    Unchanged,
    Unreachable,
    /// Waits for the gate, then answers `Unchanged`.
    Gated(Arc<Notify>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Default)]
pub struct FakeFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(
        &self,
        url: &str,
        etag: Option<&ValidatorToken>,
        last_modified: Option<&str>,
    ) -> Result<FetchOutcome> {
        self.calls.lock().unwrap().push(FetchCall {
            url: url.to_string(),
            etag: etag.map(|e| e.as_str().to_string()),
            last_modified: last_modified.map(str::to_string),
        });

        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Feed(feed, validators)) => Ok(FetchOutcome::Fetched { feed, validators }),
            Some(Reply::Unchanged) => Ok(FetchOutcome::Unchanged),
            Some(Reply::Gated(gate)) => {
                gate.notified().await;
                Ok(FetchOutcome::Unchanged)
            }
            Some(Reply::Unreachable) | None => Err(AggregatorError::Timeout {
                url: url.to_string(),
                seconds: 1,
            }),
        }
    }
}

/// Returns a fixed page for every URL.
pub struct StaticExtractor;

#[async_trait]
impl LinkExtractor for StaticExtractor {
    async fn extract(&self, url: &Url) -> Result<ExtractedPage> {
        Ok(ExtractedPage {
            cleaned_url: url.to_string(),
            hostname: url.host_str().map(str::to_string),
            title: Some("A page".to_string()),
            excerpt: Some("Some text.".to_string()),
            author: None,
            text_content: Some("Some text. More text.".to_string()),
            header_image_url: None,
            read_time_seconds: Some(1),
        })
    }
}

/// Records every attempt it receives. Attempts can be held back by a gate.
#[derive(Default)]
pub struct Recorder {
    attempts: Mutex<Vec<EnrichmentTask>>,
    finished: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every attempt waits for a permit on `gate` before it finishes.
    pub fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Default::default()
        })
    }

    pub fn attempts(&self) -> Vec<EnrichmentTask> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            summarizer: self.clone(),
            archiver: self.clone(),
            converter: self.clone(),
        }
    }

    async fn attempt(&self, task: EnrichmentTask) -> anyhow::Result<()> {
        self.attempts.lock().unwrap().push(task);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await?;
            permit.forget();
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Summarizer for Recorder {
    async fn maybe_summarize(&self, link: LinkId) -> anyhow::Result<()> {
        self.attempt(EnrichmentTask::Summarize(link)).await
    }
}

#[async_trait]
impl Archiver for Recorder {
    async fn maybe_archive(&self, link: LinkId) -> anyhow::Result<()> {
        self.attempt(EnrichmentTask::Archive(link)).await
    }
}

#[async_trait]
impl FeedItemConverter for Recorder {
    async fn maybe_convert(&self, item: FeedItemId) -> anyhow::Result<()> {
        self.attempt(EnrichmentTask::ConvertToLink(item)).await
    }
}
