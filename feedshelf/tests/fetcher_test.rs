mod common;

use std::io::Write;

use chrono::{TimeZone, Utc};
use common::{init_tracing, rss};
use feedshelf::{
    AggregatorError, ErrorKind, FeedFetcher, FetchConfig, FetchOutcome, Fetcher,
    HttpLinkExtractor, LinkExtractor,
};
use interfaces::ValidatorToken;
use mockito::Matcher;
use url::Url;

fn fetcher() -> Fetcher {
    Fetcher::new(FetchConfig {
        timeout_seconds: 5,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn first_fetch_returns_feed_and_validators() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let published = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mock = server
        .mock("GET", "/feed.xml")
        .match_header("if-none-match", Matcher::Missing)
        .match_header("if-modified-since", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_header("etag", "\"v1\"")
        .with_header("last-modified", "Fri, 01 Mar 2024 12:00:00 GMT")
        .with_body(rss(&[("a", Some(published)), ("b", None)]))
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let outcome = fetcher().fetch(&url, None, None).await.unwrap();
    mock.assert_async().await;

    let FetchOutcome::Fetched { feed, validators } = outcome else {
        panic!("expected a parsed feed");
    };
    assert_eq!(feed.title.as_deref(), Some("Example feed"));
    assert_eq!(feed.entries.len(), 2);
    assert_eq!(feed.entries[0].guid, "a");
    assert_eq!(feed.entries[0].published_at, Some(published));
    assert_eq!(feed.entries[1].published_at, None);
    assert_eq!(validators.etag.as_str(), "\"v1\"");
    assert_eq!(validators.last_modified, "Fri, 01 Mar 2024 12:00:00 GMT");
}

#[tokio::test]
async fn absent_validators_come_back_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(rss(&[("a", None)]))
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let FetchOutcome::Fetched { validators, .. } = fetcher().fetch(&url, None, None).await.unwrap()
    else {
        panic!("expected a parsed feed");
    };
    assert!(validators.etag.is_empty());
    assert!(validators.last_modified.is_empty());
}

#[tokio::test]
async fn stored_validators_are_sent_and_304_means_unchanged() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/feed.xml")
        .match_header("if-none-match", "\"v1\"")
        .match_header("if-modified-since", "Fri, 01 Mar 2024 12:00:00 GMT")
        .with_status(304)
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let etag = ValidatorToken::new("\"v1\"");
    let outcome = fetcher()
        .fetch(&url, Some(&etag), Some("Fri, 01 Mar 2024 12:00:00 GMT"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(matches!(outcome, FetchOutcome::Unchanged));
}

#[tokio::test]
async fn empty_or_unparseable_validators_are_not_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/feed.xml")
        .match_header("if-none-match", Matcher::Missing)
        .match_header("if-modified-since", Matcher::Missing)
        .with_status(200)
        .with_body(rss(&[]))
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let etag = ValidatorToken::default();
    let outcome = fetcher()
        .fetch(&url, Some(&etag), Some("last tuesday"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(matches!(outcome, FetchOutcome::Fetched { .. }));
}

#[tokio::test]
async fn server_errors_are_transport_failures() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(500)
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let err = fetcher().fetch(&url, None, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn unreachable_hosts_are_transport_failures() {
    let err = fetcher()
        .fetch("http://127.0.0.1:1/feed.xml", None, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn malformed_documents_are_parse_failures() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body("<html><body>not a feed</body></html>")
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let err = fetcher().fetch(&url, None, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

const MIB: usize = 1024 * 1024;

fn fetcher_capped_at_one_mib() -> Fetcher {
    Fetcher::new(FetchConfig {
        timeout_seconds: 5,
        max_feed_size_mb: 1,
        ..Default::default()
    })
    .unwrap()
}

/// A valid feed padded with a comment to exactly `len` bytes.
fn padded_feed(len: usize) -> String {
    let doc = rss(&[("a", None)]);
    let filler = len - doc.len() - "<!---->".len();
    doc.replacen("</channel>", &format!("<!--{}--></channel>", "x".repeat(filler)), 1)
}

#[tokio::test]
async fn bodies_at_the_size_limit_are_accepted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(padded_feed(MIB))
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let outcome = fetcher_capped_at_one_mib().fetch(&url, None, None).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Fetched { .. }));
}

#[tokio::test]
async fn declared_bodies_just_over_the_limit_are_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body(padded_feed(MIB + 1))
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let err = fetcher_capped_at_one_mib()
        .fetch(&url, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::BodyTooLarge { limit_bytes, .. } if limit_bytes == MIB));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn chunked_bodies_are_cut_off_at_the_limit() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_chunked_body(|w| {
            for _ in 0..3 {
                w.write_all(format!("<!--{}-->", "x".repeat(MIB)).as_bytes())?;
            }
            w.write_all(rss(&[("a", None)]).as_bytes())
        })
        .create_async()
        .await;

    let url = format!("{}/feed.xml", server.url());
    let err = fetcher_capped_at_one_mib()
        .fetch(&url, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::BodyTooLarge { .. }));
}

#[tokio::test]
async fn page_extraction_shares_the_size_limit() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/article")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_chunked_body(|w| {
            w.write_all(b"<html><body>")?;
            for _ in 0..2 {
                w.write_all("<p>word </p>".repeat(MIB / 8).as_bytes())?;
            }
            w.write_all(b"</body></html>")
        })
        .create_async()
        .await;

    let extractor = HttpLinkExtractor::new(&FetchConfig {
        timeout_seconds: 5,
        max_feed_size_mb: 1,
        ..Default::default()
    })
    .unwrap();
    let url = Url::parse(&format!("{}/article", server.url())).unwrap();
    let err = extractor.extract(&url).await.unwrap_err();
    assert!(matches!(err, AggregatorError::BodyTooLarge { .. }));
}
