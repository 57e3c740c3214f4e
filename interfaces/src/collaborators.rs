use anyhow::Result;
use async_trait::async_trait;

use crate::defs::{FeedItemId, LinkId};

/// Produces a summary for a link when it makes sense to. Best effort.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn maybe_summarize(&self, link: LinkId) -> Result<()>;
}

/// Takes a snapshot of the page behind a link. Best effort.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn maybe_archive(&self, link: LinkId) -> Result<()>;
}

/// Turns a feed item into a link when the owning feed asks for it.
/// May be a no-op.
#[async_trait]
pub trait FeedItemConverter: Send + Sync {
    async fn maybe_convert(&self, item: FeedItemId) -> Result<()>;
}
