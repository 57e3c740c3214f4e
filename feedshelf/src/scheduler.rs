use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use interfaces::{Feed, Store};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::fetcher::FeedFetcher;
use crate::sync::sync_feed_items;
use crate::types::{FetchOutcome, Result};

/// Reference cadence between sync cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSyncOutcome {
    Unchanged,
    Synced { inserted: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds: usize,
    pub unchanged: usize,
    pub synced: usize,
    pub failed: usize,
    pub inserted: usize,
}

/// Periodically walks every feed and pulls new items.
pub struct FeedScheduler {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn FeedFetcher>,
    cycle: Mutex<()>,
}

impl FeedScheduler {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            store,
            fetcher,
            cycle: Mutex::new(()),
        }
    }

    /// Runs one full cycle. Returns `None` when another cycle is still running.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.cycle.try_lock() else {
            warn!("Previous feed sync cycle still running, skipping this one");
            return None;
        };

        let feeds = match self.store.list_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => {
                error!("Failed to list feeds for sync: {}", e);
                return Some(CycleReport::default());
            }
        };

        let mut report = CycleReport {
            feeds: feeds.len(),
            ..Default::default()
        };
        info!("Syncing {} feeds", feeds.len());

        for feed in &feeds {
            match self.sync_feed(feed).await {
                Ok(FeedSyncOutcome::Unchanged) => report.unchanged += 1,
                Ok(FeedSyncOutcome::Synced { inserted }) => {
                    report.synced += 1;
                    report.inserted += inserted;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(kind = ?e.kind(), "Failed to sync feed {} ({}): {}", feed.id, feed.url, e);
                }
            }
        }

        info!(
            "Feed sync cycle done: {} synced, {} unchanged, {} failed, {} new items",
            report.synced, report.unchanged, report.failed, report.inserted
        );
        Some(report)
    }

    /// Fetches one feed and stores whatever is new.
    pub async fn sync_feed(&self, feed: &Feed) -> Result<FeedSyncOutcome> {
        let boundary = feed.last_fetched_at;

        let outcome = self
            .fetcher
            .fetch(
                &feed.url,
                Some(&feed.validators.etag),
                Some(feed.validators.last_modified.as_str()),
            )
            .await?;

        match outcome {
            FetchOutcome::Unchanged => Ok(FeedSyncOutcome::Unchanged),
            FetchOutcome::Fetched {
                feed: parsed,
                validators,
            } => {
                let inserted = sync_feed_items(
                    self.store.as_ref(),
                    feed,
                    &parsed,
                    validators,
                    boundary,
                    Utc::now(),
                )
                .await?;
                Ok(FeedSyncOutcome::Synced { inserted })
            }
        }
    }

    /// Starts the timer. The first cycle runs one `every` after startup.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + every, every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                let scheduler = self.clone();
                // Cycles run detached so a slow one cannot delay the timer;
                // overlap is refused inside `run_cycle`.
                tokio::spawn(async move {
                    scheduler.run_cycle().await;
                });
            }
        })
    }
}
