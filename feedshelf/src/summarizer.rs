use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interfaces::{LinkId, Store, Summarizer};
use tracing::{debug, info};

use crate::llm_adapter::LlmAdapter;

/// Summarizes links with extracted text that have no summary yet.
pub struct LlmSummarizer {
    store: Arc<dyn Store>,
    adapter: Arc<dyn LlmAdapter>,
}

impl LlmSummarizer {
    pub fn new(store: Arc<dyn Store>, adapter: Arc<dyn LlmAdapter>) -> Self {
        Self { store, adapter }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn maybe_summarize(&self, link_id: LinkId) -> Result<()> {
        let link = self
            .store
            .get_link(link_id)
            .await?
            .ok_or_else(|| anyhow!("link {} not found", link_id))?;

        if link.summary.is_some() {
            debug!("Link {} already summarized", link_id);
            return Ok(());
        }
        let Some(text) = link.text_content.as_deref().filter(|t| !t.trim().is_empty()) else {
            debug!("Link {} has no text to summarize", link_id);
            return Ok(());
        };

        let summary = self
            .adapter
            .create_summary(link.title.as_deref(), text)
            .await?;
        self.store.set_link_summary(link_id, summary).await?;

        info!("Summarized link {} with {}", link_id, self.adapter.adapter_name());
        Ok(())
    }
}
