use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use interfaces::{Archiver, LinkId, Store};
use reqwest::Client;
use tracing::{debug, info};

use crate::fetcher::read_body;
use crate::types::{self, FetchConfig};

/// Saves the raw HTML behind a link to `<dir>/<link id>.html`.
pub struct SnapshotArchiver {
    client: Client,
    store: Arc<dyn Store>,
    dir: Option<PathBuf>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl SnapshotArchiver {
    /// With no directory every request is accepted and skipped.
    pub fn new(store: Arc<dyn Store>, dir: Option<PathBuf>, config: &FetchConfig) -> types::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self {
            client,
            store,
            dir,
            timeout,
            max_body_bytes: config.max_body_bytes(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status.as_u16(), url);
        }
        Ok(read_body(response, self.max_body_bytes).await?)
    }
}

#[async_trait]
impl Archiver for SnapshotArchiver {
    async fn maybe_archive(&self, link_id: LinkId) -> Result<()> {
        let Some(dir) = &self.dir else {
            debug!("No archive directory configured, skipping link {}", link_id);
            return Ok(());
        };

        let link = self
            .store
            .get_link(link_id)
            .await?
            .ok_or_else(|| anyhow!("link {} not found", link_id))?;
        if link.archive_path.is_some() {
            debug!("Link {} already archived", link_id);
            return Ok(());
        }

        let url = if link.cleaned_url.is_empty() {
            &link.original_url
        } else {
            &link.cleaned_url
        };
        let body = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| anyhow!("archiving {} timed out", url))??;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("{}.html", link_id));
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        self.store
            .set_link_archive(link_id, path.display().to_string())
            .await?;
        info!("Archived link {} to {}", link_id, path.display());
        Ok(())
    }
}
