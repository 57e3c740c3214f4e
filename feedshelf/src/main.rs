use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feedshelf::{
    default_collaborators, Aggregator, AppConfig, FeedFetcher, Fetcher, HttpLinkExtractor,
    LeadSentencesAdapter, LlmAdapter, OpenAiAdapter, PgStore,
};
use interfaces::{FeedId, LinkId, Store, UserId};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "feedshelf", about = "Feed aggregation and link enrichment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and the enrichment queue until interrupted
    Serve,
    /// Run a single sync cycle over every feed
    SyncOnce,
    /// Subscribe a user to a feed
    AddFeed {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        url: String,
    },
    /// Save a web page as a link
    AddLink {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        url: String,
    },
    /// Archive a link on behalf of its owner
    Archive {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        link: Uuid,
    },
    /// Turn automatic link creation for a feed's items on or off
    AutoAdd {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        feed: Uuid,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Create the database tables
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedshelf=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let pg = PgStore::new(&config.database_url).await?;
    if let Command::InitDb = cli.command {
        pg.setup_schema().await?;
        return Ok(());
    }
    let backing: Arc<dyn Store> = Arc::new(pg);

    let fetcher: Arc<dyn FeedFetcher> = Arc::new(Fetcher::new(config.fetch.clone())?);
    let extractor = Arc::new(HttpLinkExtractor::new(&config.fetch)?);
    let llm: Arc<dyn LlmAdapter> = match &config.openai_api_key {
        Some(key) => Arc::new(OpenAiAdapter::new(key.clone(), config.summary_model.clone())?),
        None => Arc::new(LeadSentencesAdapter::new()),
    };
    info!("Summaries by {}", llm.adapter_name());

    let archive_dir = config.archive_dir.clone();
    let fetch_config = config.fetch.clone();
    let (aggregator, _queue) = Aggregator::start(
        backing,
        fetcher,
        extractor,
        config.dispatch.clone(),
        |store, links| default_collaborators(store, links, llm, archive_dir, &fetch_config),
    )?;

    match cli.command {
        Command::Serve => {
            let timer = aggregator.scheduler().clone().spawn(config.sync_interval);
            info!("Syncing feeds every {:?}", config.sync_interval);
            tokio::signal::ctrl_c().await?;
            timer.abort();
            info!("Shutting down");
            return Ok(());
        }
        Command::SyncOnce => {
            if let Some(report) = aggregator.run_scheduled_sync().await {
                info!("{:?}", report);
            }
        }
        Command::AddFeed { owner, url } => {
            let feed_id = aggregator.create_feed(UserId(owner), &url).await?;
            println!("{}", feed_id);
        }
        Command::AddLink { owner, url } => {
            let link = aggregator.create_link_from_url(UserId(owner), &url).await?;
            println!("{}", link.id);
        }
        Command::Archive { owner, link } => {
            let ack = aggregator.request_archive(UserId(owner), LinkId(link)).await?;
            info!("Archive of link {} queued as task {}", ack.link_id, ack.ticket.id);
        }
        Command::AutoAdd {
            owner,
            feed,
            enabled,
        } => {
            aggregator
                .set_auto_add_items(UserId(owner), FeedId(feed), enabled)
                .await?;
        }
        Command::InitDb => {}
    }

    // One-shot commands let their enrichment finish before exiting.
    aggregator.dispatcher().wait_idle().await;
    Ok(())
}
