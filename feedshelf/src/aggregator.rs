use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use interfaces::{Feed, FeedId, Link, LinkId, NewFeed, Store, UserId};
use tokio::task::JoinHandle;
use tracing::info;

use crate::archiver::SnapshotArchiver;
use crate::converter::AutoAddConverter;
use crate::dispatch::{self, Collaborators, DispatchConfig, EnrichmentTask, EventDispatcher, TaskTicket};
use crate::extractor::LinkExtractor;
use crate::fetcher::FeedFetcher;
use crate::hooks::NotifyingStore;
use crate::links::LinkCreator;
use crate::llm_adapter::LlmAdapter;
use crate::scheduler::{CycleReport, FeedScheduler};
use crate::summarizer::LlmSummarizer;
use crate::sync::save_new_items;
use crate::types::{AggregatorError, FetchConfig, FetchOutcome, Result};
use crate::utils::url as urls;

/// Returned by `request_archive` as soon as the archive task is queued.
#[derive(Debug)]
pub struct ArchiveAck {
    pub link_id: LinkId,
    /// Lets the caller observe the attempt if it cares to.
    pub ticket: TaskTicket,
}

/// Caller-facing actions over the store, fetcher and dispatcher.
pub struct Aggregator {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn FeedFetcher>,
    links: LinkCreator,
    dispatcher: EventDispatcher,
    scheduler: Arc<FeedScheduler>,
}

impl Aggregator {
    /// Wraps `backing` so creations fire enrichment, builds the collaborators
    /// against the wrapped store and starts the dispatch queue.
    pub fn start<F>(
        backing: Arc<dyn Store>,
        fetcher: Arc<dyn FeedFetcher>,
        extractor: Arc<dyn LinkExtractor>,
        dispatch_config: DispatchConfig,
        collaborators: F,
    ) -> Result<(Self, JoinHandle<()>)>
    where
        F: FnOnce(&Arc<dyn Store>, &LinkCreator) -> Result<Collaborators>,
    {
        let (dispatcher, queue) = dispatch::channel(dispatch_config);
        let store: Arc<dyn Store> = Arc::new(NotifyingStore::new(backing, dispatcher.clone()));
        let links = LinkCreator::new(store.clone(), extractor);

        let collaborators = collaborators(&store, &links)?;
        let queue_handle = queue.spawn(collaborators);

        let scheduler = Arc::new(FeedScheduler::new(store.clone(), fetcher.clone()));
        let aggregator = Self {
            store,
            fetcher,
            links,
            dispatcher,
            scheduler,
        };
        Ok((aggregator, queue_handle))
    }

    /// The store every component writes through.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &Arc<FeedScheduler> {
        &self.scheduler
    }

    /// Subscribes `owner` to the feed at `raw_url`.
    ///
    /// The first fetch is unconditional. Name, description and image are taken
    /// from it once, and every entry it carries is saved.
    pub async fn create_feed(&self, owner: UserId, raw_url: &str) -> Result<FeedId> {
        let url = urls::validate(raw_url)?;

        let (parsed, validators) = match self.fetcher.fetch(url.as_str(), None, None).await? {
            FetchOutcome::Fetched { feed, validators } => (feed, validators),
            FetchOutcome::Unchanged => {
                return Err(AggregatorError::Parse(format!(
                    "{} answered 'not modified' to an unconditional request",
                    url
                )))
            }
        };

        let feed = self
            .store
            .insert_feed(NewFeed {
                owner,
                url: url.to_string(),
                name: parsed.title.clone(),
                description: parsed.description.clone(),
                image_url: parsed.image_url.clone(),
                validators,
                last_fetched_at: Utc::now(),
            })
            .await?;

        let inserted = save_new_items(self.store.as_ref(), &feed, &parsed, None).await?;
        info!(
            "Created feed {} for {} ({}), {} items saved",
            feed.id, owner, feed.url, inserted
        );
        Ok(feed.id)
    }

    pub async fn create_link_from_url(&self, owner: UserId, raw_url: &str) -> Result<Link> {
        self.links.create_link_from_url(owner, raw_url).await
    }

    /// Queues an archive of `link_id` for its owner and returns immediately.
    pub async fn request_archive(&self, caller: UserId, link_id: LinkId) -> Result<ArchiveAck> {
        let link = self
            .store
            .get_link(link_id)
            .await?
            .ok_or_else(|| AggregatorError::NotFound {
                entity: "link",
                id: link_id.to_string(),
            })?;

        if link.owner != caller {
            return Err(AggregatorError::Forbidden {
                entity: "link",
                id: link_id.to_string(),
                caller: caller.to_string(),
            });
        }

        let ticket = self.dispatcher.dispatch(EnrichmentTask::Archive(link_id));
        info!("Archive of link {} requested by {}", link_id, caller);
        Ok(ArchiveAck { link_id, ticket })
    }

    pub async fn set_auto_add_items(
        &self,
        caller: UserId,
        feed_id: FeedId,
        enabled: bool,
    ) -> Result<Feed> {
        let feed = self
            .store
            .get_feed(feed_id)
            .await?
            .ok_or_else(|| AggregatorError::NotFound {
                entity: "feed",
                id: feed_id.to_string(),
            })?;

        if feed.owner != caller {
            return Err(AggregatorError::Forbidden {
                entity: "feed",
                id: feed_id.to_string(),
                caller: caller.to_string(),
            });
        }

        self.store.set_feed_auto_add(feed_id, enabled).await?;
        info!("Feed {}: auto-add items to links = {}", feed_id, enabled);
        Ok(Feed {
            auto_add_items_to_links: enabled,
            ..feed
        })
    }

    /// One scheduler cycle, `None` when a cycle is already running.
    pub async fn run_scheduled_sync(&self) -> Option<CycleReport> {
        self.scheduler.run_cycle().await
    }
}

/// Production collaborators: LLM summaries, HTML snapshots and auto-add conversion.
pub fn default_collaborators(
    store: &Arc<dyn Store>,
    links: &LinkCreator,
    llm: Arc<dyn LlmAdapter>,
    archive_dir: Option<PathBuf>,
    fetch_config: &FetchConfig,
) -> Result<Collaborators> {
    Ok(Collaborators {
        summarizer: Arc::new(LlmSummarizer::new(store.clone(), llm)),
        archiver: Arc::new(SnapshotArchiver::new(store.clone(), archive_dir, fetch_config)?),
        converter: Arc::new(AutoAddConverter::new(store.clone(), links.clone())),
    })
}
