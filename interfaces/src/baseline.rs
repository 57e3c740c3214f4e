use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::defs::{
    Feed, FeedId, FeedItem, FeedItemId, FetchValidators, Link, LinkId, NewFeed, NewFeedItem,
    NewLink,
};
use crate::state::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    feeds: Vec<Feed>,
    feed_items: HashMap<FeedItemId, FeedItem>,
    // (feed, guid) -> item, the uniqueness index
    item_index: HashMap<(FeedId, String), FeedItemId>,
    links: HashMap<LinkId, Link>,
}

/// Reference `Store` kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn feed_items(&self, feed: FeedId) -> Vec<FeedItem> {
        let tables = self.tables.read().await;
        let mut items: Vec<FeedItem> = tables
            .feed_items
            .values()
            .filter(|item| item.feed_id == feed)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        items
    }

    pub async fn links(&self) -> Vec<Link> {
        let tables = self.tables.read().await;
        let mut links: Vec<Link> = tables.links.values().cloned().collect();
        links.sort_by_key(|link| link.created_at);
        links
    }
}

fn missing(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::Missing {
        entity,
        id: id.to_string(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_feed(&self, feed: NewFeed) -> StoreResult<Feed> {
        let record = Feed {
            id: FeedId::new(),
            owner: feed.owner,
            url: feed.url,
            name: feed.name,
            description: feed.description,
            image_url: feed.image_url,
            validators: feed.validators,
            last_fetched_at: Some(feed.last_fetched_at),
            auto_add_items_to_links: false,
            created_at: Utc::now(),
        };
        self.tables.write().await.feeds.push(record.clone());
        Ok(record)
    }

    async fn get_feed(&self, id: FeedId) -> StoreResult<Option<Feed>> {
        let tables = self.tables.read().await;
        Ok(tables.feeds.iter().find(|feed| feed.id == id).cloned())
    }

    async fn list_feeds(&self) -> StoreResult<Vec<Feed>> {
        Ok(self.tables.read().await.feeds.clone())
    }

    async fn record_feed_fetch(
        &self,
        id: FeedId,
        validators: FetchValidators,
        fetched_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let feed = tables
            .feeds
            .iter_mut()
            .find(|feed| feed.id == id)
            .ok_or_else(|| missing("feed", id))?;
        feed.validators = validators;
        feed.last_fetched_at = Some(fetched_at);
        Ok(())
    }

    async fn set_feed_auto_add(&self, id: FeedId, enabled: bool) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let feed = tables
            .feeds
            .iter_mut()
            .find(|feed| feed.id == id)
            .ok_or_else(|| missing("feed", id))?;
        feed.auto_add_items_to_links = enabled;
        Ok(())
    }

    async fn find_feed_item(&self, feed: FeedId, guid: &str) -> StoreResult<Option<FeedItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .item_index
            .get(&(feed, guid.to_string()))
            .and_then(|id| tables.feed_items.get(id))
            .cloned())
    }

    async fn insert_feed_item(&self, item: NewFeedItem) -> StoreResult<Option<FeedItem>> {
        let mut tables = self.tables.write().await;
        let key = (item.feed_id, item.guid.clone());
        if tables.item_index.contains_key(&key) {
            return Ok(None);
        }

        let record = FeedItem {
            id: FeedItemId::new(),
            feed_id: item.feed_id,
            owner: item.owner,
            guid: item.guid,
            title: item.title,
            description: item.description,
            url: item.url,
            published_at: item.published_at,
            created_at: Utc::now(),
        };
        tables.item_index.insert(key, record.id);
        tables.feed_items.insert(record.id, record.clone());
        Ok(Some(record))
    }

    async fn get_feed_item(&self, id: FeedItemId) -> StoreResult<Option<FeedItem>> {
        Ok(self.tables.read().await.feed_items.get(&id).cloned())
    }

    async fn count_feed_items(&self, feed: FeedId) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .feed_items
            .values()
            .filter(|item| item.feed_id == feed)
            .count())
    }

    async fn insert_link(&self, link: NewLink) -> StoreResult<Link> {
        let record = Link {
            id: LinkId::new(),
            owner: link.owner,
            original_url: link.original_url,
            cleaned_url: link.cleaned_url,
            hostname: link.hostname,
            title: link.title,
            excerpt: link.excerpt,
            author: link.author,
            text_content: link.text_content,
            header_image_url: link.header_image_url,
            read_time_seconds: link.read_time_seconds,
            summary: None,
            archive_path: None,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .links
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_link(&self, id: LinkId) -> StoreResult<Option<Link>> {
        Ok(self.tables.read().await.links.get(&id).cloned())
    }

    async fn set_link_summary(&self, id: LinkId, summary: String) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let link = tables.links.get_mut(&id).ok_or_else(|| missing("link", id))?;
        link.summary = Some(summary);
        Ok(())
    }

    async fn set_link_archive(&self, id: LinkId, archive_path: String) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let link = tables.links.get_mut(&id).ok_or_else(|| missing("link", id))?;
        link.archive_path = Some(archive_path);
        Ok(())
    }
}
