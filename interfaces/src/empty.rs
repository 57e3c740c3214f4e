use anyhow::Result;
use async_trait::async_trait;

use crate::collaborators::{Archiver, FeedItemConverter, Summarizer};
use crate::defs::{FeedItemId, LinkId};

/// Collaborator that accepts every request and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl Summarizer for Noop {
    async fn maybe_summarize(&self, _link: LinkId) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Archiver for Noop {
    async fn maybe_archive(&self, _link: LinkId) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl FeedItemConverter for Noop {
    async fn maybe_convert(&self, _item: FeedItemId) -> Result<()> {
        // Nothing matters, no item ever becomes a link.
        Ok(())
    }
}
