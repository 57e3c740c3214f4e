mod common;

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use common::{entry, init_tracing, parsed, validators};
use feedshelf::{save_new_items, sync_feed_items};
use interfaces::{Feed, FetchValidators, MemoryStore, NewFeed, Store, UserId};

async fn feed_in(store: &MemoryStore, url: &str) -> Feed {
    store
        .insert_feed(NewFeed {
            owner: UserId::new(),
            url: url.to_string(),
            name: None,
            description: None,
            image_url: None,
            validators: FetchValidators::default(),
            last_fetched_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn boundary_is_strict() {
    init_tracing();
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    let boundary = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let document = parsed(vec![
        entry("before", Some(boundary - Duration::seconds(1))),
        entry("at", Some(boundary)),
        entry("after", Some(boundary + Duration::seconds(1))),
    ]);

    let inserted = save_new_items(&store, &feed, &document, Some(boundary))
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    let guids: Vec<String> = store
        .feed_items(feed.id)
        .await
        .into_iter()
        .map(|item| item.guid)
        .collect();
    assert_eq!(guids, vec!["after".to_string()]);
}

#[tokio::test]
async fn undated_items_skip_the_boundary_but_not_dedup() {
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    let boundary = Utc::now();
    let document = parsed(vec![entry("undated", None)]);

    let first = save_new_items(&store, &feed, &document, Some(boundary))
        .await
        .unwrap();
    let second = save_new_items(&store, &feed, &document, Some(boundary + Duration::days(1)))
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(store.count_feed_items(feed.id).await.unwrap(), 1);
}

#[tokio::test]
async fn no_boundary_means_nothing_is_too_old() {
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    let document = parsed(vec![
        entry("old", Some(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap())),
        entry("undated", None),
    ]);

    assert_eq!(save_new_items(&store, &feed, &document, None).await.unwrap(), 2);
}

#[tokio::test]
async fn repeated_cycles_never_duplicate_a_guid() {
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    let document = parsed(vec![
        entry("x", None),
        entry("y", None),
        entry("x", None),
    ]);

    for _ in 0..3 {
        sync_feed_items(&store, &feed, &document, validators("e", ""), None, Utc::now())
            .await
            .unwrap();
    }

    let items = store.feed_items(feed.id).await;
    let unique: HashSet<&str> = items.iter().map(|item| item.guid.as_str()).collect();
    assert_eq!(items.len(), 2);
    assert_eq!(unique.len(), 2);
}

#[tokio::test]
async fn guids_are_scoped_to_their_feed() {
    let store = MemoryStore::new();
    let a = feed_in(&store, "https://example.com/a.xml").await;
    let b = feed_in(&store, "https://example.com/b.xml").await;
    let document = parsed(vec![entry("shared", None)]);

    assert_eq!(save_new_items(&store, &a, &document, None).await.unwrap(), 1);
    assert_eq!(save_new_items(&store, &b, &document, None).await.unwrap(), 1);
}

#[tokio::test]
async fn validators_are_written_even_without_new_items() {
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    let boundary = feed.last_fetched_at;
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    let stale = parsed(vec![entry(
        "ancient",
        Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
    )]);
    let inserted = sync_feed_items(
        &store,
        &feed,
        &stale,
        validators("\"v2\"", "Sat, 01 Jun 2024 08:00:00 GMT"),
        boundary,
        now,
    )
    .await
    .unwrap();

    assert_eq!(inserted, 0);
    let stored = store.get_feed(feed.id).await.unwrap().unwrap();
    assert_eq!(stored.validators.etag.as_str(), "\"v2\"");
    assert_eq!(stored.validators.last_modified, "Sat, 01 Jun 2024 08:00:00 GMT");
    assert_eq!(stored.last_fetched_at, Some(now));
}

#[tokio::test]
async fn empty_validators_replace_old_ones() {
    let store = MemoryStore::new();
    let feed = feed_in(&store, "https://example.com/a.xml").await;
    store
        .record_feed_fetch(feed.id, validators("\"old\"", "x"), Utc::now())
        .await
        .unwrap();

    sync_feed_items(&store, &feed, &parsed(vec![]), FetchValidators::default(), None, Utc::now())
        .await
        .unwrap();

    let stored = store.get_feed(feed.id).await.unwrap().unwrap();
    assert_eq!(stored.validators, FetchValidators::default());
}
