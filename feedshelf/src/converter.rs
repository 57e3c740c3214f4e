use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interfaces::{FeedItemConverter, FeedItemId, Store};
use tracing::debug;

use crate::links::LinkCreator;

/// Adds feed items to the owner's links when their feed has auto-add enabled.
pub struct AutoAddConverter {
    store: Arc<dyn Store>,
    links: LinkCreator,
}

impl AutoAddConverter {
    pub fn new(store: Arc<dyn Store>, links: LinkCreator) -> Self {
        Self { store, links }
    }
}

#[async_trait]
impl FeedItemConverter for AutoAddConverter {
    async fn maybe_convert(&self, item_id: FeedItemId) -> Result<()> {
        let item = self
            .store
            .get_feed_item(item_id)
            .await?
            .ok_or_else(|| anyhow!("feed item {} not found", item_id))?;

        let Some(feed) = self.store.get_feed(item.feed_id).await? else {
            return Err(anyhow!("feed {} of item {} not found", item.feed_id, item_id));
        };

        if !feed.auto_add_items_to_links {
            return Ok(());
        }
        if item.url.is_empty() {
            debug!("Feed item {} has no URL, not adding it as a link", item_id);
            return Ok(());
        }

        let link = self.links.create_link_from_url(item.owner, &item.url).await?;
        debug!("Feed item {} became link {}", item_id, link.id);
        Ok(())
    }
}
