use crate::types::{ParsedEntry, ParsedFeed, Result};
use chrono::{DateTime, Utc};
use interfaces::{Feed, FetchValidators, NewFeedItem, Store};
use tracing::{debug, info};

/// Whether an entry is old enough to be treated as already seen.
///
/// Only dated entries at or before the boundary are skipped. Undated entries
/// always go on to the guid check.
pub fn predates_boundary(entry: &ParsedEntry, boundary: Option<DateTime<Utc>>) -> bool {
    match (entry.published_at, boundary) {
        (Some(published), Some(boundary)) => published <= boundary,
        _ => false,
    }
}

/// Inserts the entries of `parsed` that are newer than `boundary` and not yet
/// stored for this feed. Returns how many items were inserted.
pub async fn save_new_items(
    store: &dyn Store,
    feed: &Feed,
    parsed: &ParsedFeed,
    boundary: Option<DateTime<Utc>>,
) -> Result<usize> {
    let mut inserted = 0;

    for entry in &parsed.entries {
        if predates_boundary(entry, boundary) {
            debug!("Skipping {} in feed {}: not after boundary", entry.guid, feed.id);
            continue;
        }

        if store.find_feed_item(feed.id, &entry.guid).await?.is_some() {
            debug!("Skipping {} in feed {}: already stored", entry.guid, feed.id);
            continue;
        }

        let item = NewFeedItem {
            feed_id: feed.id,
            owner: feed.owner,
            guid: entry.guid.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            url: entry.url.clone(),
            published_at: entry.published_at,
        };

        // A concurrent writer may have won the race since the lookup above.
        if store.insert_feed_item(item).await?.is_some() {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Applies one successful fetch to a feed: validators and `last_fetched_at`
/// are written first, then new items are saved.
///
/// `boundary` is the feed's `last_fetched_at` from before this cycle.
pub async fn sync_feed_items(
    store: &dyn Store,
    feed: &Feed,
    parsed: &ParsedFeed,
    validators: FetchValidators,
    boundary: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<usize> {
    store.record_feed_fetch(feed.id, validators, now).await?;

    let inserted = save_new_items(store, feed, parsed, boundary).await?;

    info!(
        "Feed {}: {} entries in document, {} new items stored",
        feed.id,
        parsed.entries.len(),
        inserted
    );

    Ok(inserted)
}
