use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;
use url::Url;

use crate::fetcher::read_body;
use crate::types::{AggregatorError, FetchConfig, Result};
use crate::utils::{text, url as urls};

const EXCERPT_CHARS: usize = 280;

/// What an extractor pulled out of a web page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// URL after redirects.
    pub cleaned_url: String,
    pub hostname: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub text_content: Option<String>,
    pub header_image_url: Option<String>,
    pub read_time_seconds: Option<i32>,
}

/// Loads a page and extracts its readable content.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn extract(&self, url: &Url) -> Result<ExtractedPage>;
}

pub struct HttpLinkExtractor {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpLinkExtractor {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_body_bytes: config.max_body_bytes(),
        })
    }

    async fn load(&self, url: &Url) -> Result<(Url, String)> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().clone();
        let body = read_body(response, self.max_body_bytes).await?;
        Ok((final_url, String::from_utf8_lossy(&body).into_owned()))
    }
}

#[async_trait]
impl LinkExtractor for HttpLinkExtractor {
    async fn extract(&self, url: &Url) -> Result<ExtractedPage> {
        let (final_url, body) = tokio::time::timeout(self.timeout, self.load(url))
            .await
            .map_err(|_| AggregatorError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        debug!("Loaded {} ({} bytes)", final_url, body.len());
        extract_page(&final_url, &body)
    }
}

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[content]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

const NOISE_TAGS: [&str; 6] = ["script", "style", "noscript", "nav", "header", "footer"];

/// Content of the first `<meta name|property=key content=...>` tag.
fn meta_content(document: &Html, key: &str) -> Option<String> {
    document.select(&META).find_map(|meta| {
        let el = meta.value();
        let matches_key = ["name", "property"]
            .iter()
            .filter_map(|attr| el.attr(attr))
            .any(|v| v.eq_ignore_ascii_case(key));
        if !matches_key {
            return None;
        }
        el.attr("content")
            .map(text::collapse_whitespace)
            .filter(|c| !c.is_empty())
    })
}

/// Visible text under `root`, skipping scripts, styles and page chrome.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Node::Text(chunk) = node.value() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| NOISE_TAGS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(chunk);
            out.push(' ');
        }
    }
    text::collapse_whitespace(&out)
}

/// Builds an `ExtractedPage` from a loaded HTML document.
pub fn extract_page(final_url: &Url, html: &str) -> Result<ExtractedPage> {
    if html.trim().is_empty() {
        return Err(AggregatorError::Parse(format!(
            "empty document at {}",
            final_url
        )));
    }

    let document = Html::parse_document(html);

    let title = meta_content(&document, "og:title").or_else(|| {
        document
            .select(&TITLE)
            .next()
            .map(|t| text::collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    });

    // html5ever always synthesizes a <body>.
    let text_content = document
        .select(&BODY)
        .next()
        .map(visible_text)
        .filter(|t| !t.is_empty());

    let excerpt = meta_content(&document, "description")
        .or_else(|| meta_content(&document, "og:description"))
        .or_else(|| text_content.as_deref().map(|t| text::excerpt(t, EXCERPT_CHARS)));

    let header_image_url = meta_content(&document, "og:image")
        .and_then(|src| final_url.join(&src).ok())
        .map(|u| u.to_string());

    let read_time_seconds = text_content.as_deref().map(text::read_time_seconds);

    Ok(ExtractedPage {
        cleaned_url: final_url.to_string(),
        hostname: urls::hostname(final_url),
        title,
        excerpt,
        author: meta_content(&document, "author"),
        text_content,
        header_image_url,
        read_time_seconds,
    })
}
