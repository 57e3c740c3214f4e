use crate::types::{AggregatorError, ParsedEntry, ParsedFeed, Result};
use feed_rs::parser;
use tracing::debug;

/// Parses RSS, Atom and JSON Feed documents into a `ParsedFeed`.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &[u8]) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content)
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);
        let image_url = feed.logo.or(feed.icon).map(|image| image.uri);

        let entries: Vec<ParsedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed {
            title,
            description,
            image_url,
            entries,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> ParsedEntry {
        let url = entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_default();

        // Atom entries always carry `updated`; fall back to it when `published` is absent.
        let published_at = entry.published.or(entry.updated);

        ParsedEntry {
            guid: entry.id,
            url,
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: entry.summary.map(|s| s.content),
            published_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example channel</description>
    <image><url>https://example.com/logo.png</url><title>Example</title><link>https://example.com</link></image>
    <item>
      <title>Dated</title>
      <link>https://example.com/dated</link>
      <guid>dated-1</guid>
      <pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate>
      <description>first</description>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.com/undated</link>
      <guid>undated-1</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_rss_channel_and_items_in_order() {
        let feed = FeedParser::parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Example"));
        assert_eq!(feed.description.as_deref(), Some("Example channel"));
        assert_eq!(feed.image_url.as_deref(), Some("https://example.com/logo.png"));
        assert_eq!(feed.entries.len(), 2);

        let dated = &feed.entries[0];
        assert_eq!(dated.guid, "dated-1");
        assert_eq!(dated.url, "https://example.com/dated");
        assert_eq!(
            dated.published_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 10, 4, 0, 0).unwrap())
        );

        let undated = &feed.entries[1];
        assert_eq!(undated.guid, "undated-1");
        assert_eq!(undated.published_at, None);
    }

    #[test]
    fn rejects_non_feed_documents() {
        let err = FeedParser::parse_feed(b"<html><body>not a feed</body></html>").unwrap_err();
        assert!(matches!(err, AggregatorError::Parse(_)));
    }
}
