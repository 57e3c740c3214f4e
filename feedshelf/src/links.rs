use std::sync::Arc;

use interfaces::{Link, NewLink, Store, UserId};
use tracing::info;

use crate::extractor::LinkExtractor;
use crate::types::Result;
use crate::utils::url as urls;

/// Turns a submitted URL into a stored Link.
#[derive(Clone)]
pub struct LinkCreator {
    store: Arc<dyn Store>,
    extractor: Arc<dyn LinkExtractor>,
}

impl LinkCreator {
    pub fn new(store: Arc<dyn Store>, extractor: Arc<dyn LinkExtractor>) -> Self {
        Self { store, extractor }
    }

    /// Loads the page, extracts its content and stores the Link.
    ///
    /// The store fires the enrichment hooks once the insert succeeds.
    pub async fn create_link_from_url(&self, owner: UserId, raw_url: &str) -> Result<Link> {
        let url = urls::validate(raw_url)?;
        let page = self.extractor.extract(&url).await?;

        let link = self
            .store
            .insert_link(NewLink {
                owner,
                original_url: url.to_string(),
                cleaned_url: page.cleaned_url,
                hostname: page.hostname,
                title: page.title,
                excerpt: page.excerpt,
                author: page.author,
                text_content: page.text_content,
                header_image_url: page.header_image_url,
                read_time_seconds: page.read_time_seconds,
            })
            .await?;

        info!("Created link {} for {} ({})", link.id, owner, link.original_url);
        Ok(link)
    }
}
