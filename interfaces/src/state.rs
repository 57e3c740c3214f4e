use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::defs::{
    Feed, FeedId, FeedItem, FeedItemId, FetchValidators, Link, LinkId, NewFeed, NewFeedItem,
    NewLink,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("{entity} not found: {id}")]
    Missing { entity: &'static str, id: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistent storage for feeds, feed items and links.
///
/// A single call is atomic; nothing spans calls.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_feed(&self, feed: NewFeed) -> StoreResult<Feed>;

    async fn get_feed(&self, id: FeedId) -> StoreResult<Option<Feed>>;

    /// Every feed regardless of owner, oldest first.
    async fn list_feeds(&self) -> StoreResult<Vec<Feed>>;

    /// Writes validators and `last_fetched_at` together.
    async fn record_feed_fetch(
        &self,
        id: FeedId,
        validators: FetchValidators,
        fetched_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn set_feed_auto_add(&self, id: FeedId, enabled: bool) -> StoreResult<()>;

    async fn find_feed_item(&self, feed: FeedId, guid: &str) -> StoreResult<Option<FeedItem>>;

    /// Returns `None` when an item with the same (feed, guid) already exists.
    async fn insert_feed_item(&self, item: NewFeedItem) -> StoreResult<Option<FeedItem>>;

    async fn get_feed_item(&self, id: FeedItemId) -> StoreResult<Option<FeedItem>>;

    async fn count_feed_items(&self, feed: FeedId) -> StoreResult<usize>;

    async fn insert_link(&self, link: NewLink) -> StoreResult<Link>;

    async fn get_link(&self, id: LinkId) -> StoreResult<Option<Link>>;

    async fn set_link_summary(&self, id: LinkId, summary: String) -> StoreResult<()>;

    async fn set_link_archive(&self, id: LinkId, archive_path: String) -> StoreResult<()>;
}

#[async_trait]
impl<T: Store + ?Sized> Store for std::sync::Arc<T> {
    async fn insert_feed(&self, feed: NewFeed) -> StoreResult<Feed> {
        (**self).insert_feed(feed).await
    }

    async fn get_feed(&self, id: FeedId) -> StoreResult<Option<Feed>> {
        (**self).get_feed(id).await
    }

    async fn list_feeds(&self) -> StoreResult<Vec<Feed>> {
        (**self).list_feeds().await
    }

    async fn record_feed_fetch(
        &self,
        id: FeedId,
        validators: FetchValidators,
        fetched_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).record_feed_fetch(id, validators, fetched_at).await
    }

    async fn set_feed_auto_add(&self, id: FeedId, enabled: bool) -> StoreResult<()> {
        (**self).set_feed_auto_add(id, enabled).await
    }

    async fn find_feed_item(&self, feed: FeedId, guid: &str) -> StoreResult<Option<FeedItem>> {
        (**self).find_feed_item(feed, guid).await
    }

    async fn insert_feed_item(&self, item: NewFeedItem) -> StoreResult<Option<FeedItem>> {
        (**self).insert_feed_item(item).await
    }

    async fn get_feed_item(&self, id: FeedItemId) -> StoreResult<Option<FeedItem>> {
        (**self).get_feed_item(id).await
    }

    async fn count_feed_items(&self, feed: FeedId) -> StoreResult<usize> {
        (**self).count_feed_items(feed).await
    }

    async fn insert_link(&self, link: NewLink) -> StoreResult<Link> {
        (**self).insert_link(link).await
    }

    async fn get_link(&self, id: LinkId) -> StoreResult<Option<Link>> {
        (**self).get_link(id).await
    }

    async fn set_link_summary(&self, id: LinkId, summary: String) -> StoreResult<()> {
        (**self).set_link_summary(id, summary).await
    }

    async fn set_link_archive(&self, id: LinkId, archive_path: String) -> StoreResult<()> {
        (**self).set_link_archive(id, archive_path).await
    }
}
