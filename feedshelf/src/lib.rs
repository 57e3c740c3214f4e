pub mod aggregator;
pub mod archiver;
pub mod config;
pub mod converter;
pub mod dispatch;
pub mod extractor;
pub mod fetcher;
pub mod hooks;
pub mod links;
pub mod llm_adapter;
pub mod parser;
pub mod pg_store;
pub mod scheduler;
pub mod summarizer;
pub mod sync;
pub mod types;
pub mod utils;

pub use aggregator::{default_collaborators, Aggregator, ArchiveAck};
pub use archiver::SnapshotArchiver;
pub use config::AppConfig;
pub use converter::AutoAddConverter;
pub use dispatch::{
    Collaborators, DispatchConfig, DispatchQueue, EnrichmentTask, EventDispatcher, TaskOutcome,
    TaskTicket,
};
pub use extractor::{ExtractedPage, HttpLinkExtractor, LinkExtractor};
pub use fetcher::{FeedFetcher, Fetcher};
pub use hooks::NotifyingStore;
pub use links::LinkCreator;
pub use llm_adapter::{LeadSentencesAdapter, LlmAdapter, OpenAiAdapter};
pub use parser::FeedParser;
pub use pg_store::PgStore;
pub use scheduler::{CycleReport, FeedScheduler, FeedSyncOutcome, DEFAULT_SYNC_INTERVAL};
pub use summarizer::LlmSummarizer;
pub use sync::{predates_boundary, save_new_items, sync_feed_items};
pub use types::*;
