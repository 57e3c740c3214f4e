use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{
    CreatedEntity, Feed, FeedId, FeedItem, FeedItemId, FetchValidators, Link, LinkId, NewFeed,
    NewFeedItem, NewLink, Store, StoreResult,
};

use crate::dispatch::EventDispatcher;

/// Store decorator that reports every created Link and FeedItem to the
/// dispatcher once the insert has succeeded.
pub struct NotifyingStore<S> {
    inner: S,
    dispatcher: EventDispatcher,
}

impl<S: Store> NotifyingStore<S> {
    pub fn new(inner: S, dispatcher: EventDispatcher) -> Self {
        Self { inner, dispatcher }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for NotifyingStore<S> {
    async fn insert_feed(&self, feed: NewFeed) -> StoreResult<Feed> {
        self.inner.insert_feed(feed).await
    }

    async fn get_feed(&self, id: FeedId) -> StoreResult<Option<Feed>> {
        self.inner.get_feed(id).await
    }

    async fn list_feeds(&self) -> StoreResult<Vec<Feed>> {
        self.inner.list_feeds().await
    }

    async fn record_feed_fetch(
        &self,
        id: FeedId,
        validators: FetchValidators,
        fetched_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.record_feed_fetch(id, validators, fetched_at).await
    }

    async fn set_feed_auto_add(&self, id: FeedId, enabled: bool) -> StoreResult<()> {
        self.inner.set_feed_auto_add(id, enabled).await
    }

    async fn find_feed_item(&self, feed: FeedId, guid: &str) -> StoreResult<Option<FeedItem>> {
        self.inner.find_feed_item(feed, guid).await
    }

    async fn insert_feed_item(&self, item: NewFeedItem) -> StoreResult<Option<FeedItem>> {
        let created = self.inner.insert_feed_item(item).await?;
        if let Some(item) = &created {
            self.dispatcher
                .on_entity_created(CreatedEntity::FeedItem(item.id));
        }
        Ok(created)
    }

    async fn get_feed_item(&self, id: FeedItemId) -> StoreResult<Option<FeedItem>> {
        self.inner.get_feed_item(id).await
    }

    async fn count_feed_items(&self, feed: FeedId) -> StoreResult<usize> {
        self.inner.count_feed_items(feed).await
    }

    async fn insert_link(&self, link: NewLink) -> StoreResult<Link> {
        let link = self.inner.insert_link(link).await?;
        self.dispatcher.on_entity_created(CreatedEntity::Link(link.id));
        Ok(link)
    }

    async fn get_link(&self, id: LinkId) -> StoreResult<Option<Link>> {
        self.inner.get_link(id).await
    }

    async fn set_link_summary(&self, id: LinkId, summary: String) -> StoreResult<()> {
        self.inner.set_link_summary(id, summary).await
    }

    async fn set_link_archive(&self, id: LinkId, archive_path: String) -> StoreResult<()> {
        self.inner.set_link_archive(id, archive_path).await
    }
}
