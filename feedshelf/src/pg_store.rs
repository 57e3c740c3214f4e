use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{
    Feed, FeedId, FeedItem, FeedItemId, FetchValidators, Link, LinkId, NewFeed, NewFeedItem,
    NewLink, Store, StoreError, StoreResult, ValidatorToken,
};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::types::Result;

/// Postgres backed `Store`.
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the tables when they do not exist yet.
    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL,
                url TEXT NOT NULL,
                name TEXT,
                description TEXT,
                image_url TEXT,
                etag TEXT NOT NULL DEFAULT '',
                last_modified TEXT NOT NULL DEFAULT '',
                last_fetched_at TIMESTAMP WITH TIME ZONE,
                auto_add_items_to_links BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_items (
                id UUID PRIMARY KEY,
                feed_id UUID NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                owner_id UUID NOT NULL,
                guid TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                url TEXT NOT NULL,
                published_at TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (feed_id, guid)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL,
                original_url TEXT NOT NULL,
                cleaned_url TEXT NOT NULL,
                hostname TEXT,
                title TEXT,
                excerpt TEXT,
                author TEXT,
                text_content TEXT,
                header_image_url TEXT,
                read_time_seconds INTEGER,
                summary TEXT,
                archive_path TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        info!("Database schema ready");
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn missing(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::Missing {
        entity,
        id: id.to_string(),
    }
}

#[derive(FromRow)]
struct FeedRow {
    id: Uuid,
    owner_id: Uuid,
    url: String,
    name: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    etag: String,
    last_modified: String,
    last_fetched_at: Option<DateTime<Utc>>,
    auto_add_items_to_links: bool,
    created_at: DateTime<Utc>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id.into(),
            owner: row.owner_id.into(),
            url: row.url,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            validators: FetchValidators {
                etag: ValidatorToken::new(row.etag),
                last_modified: row.last_modified,
            },
            last_fetched_at: row.last_fetched_at,
            auto_add_items_to_links: row.auto_add_items_to_links,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct FeedItemRow {
    id: Uuid,
    feed_id: Uuid,
    owner_id: Uuid,
    guid: String,
    title: String,
    description: Option<String>,
    url: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<FeedItemRow> for FeedItem {
    fn from(row: FeedItemRow) -> Self {
        FeedItem {
            id: row.id.into(),
            feed_id: row.feed_id.into(),
            owner: row.owner_id.into(),
            guid: row.guid,
            title: row.title,
            description: row.description,
            url: row.url,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct LinkRow {
    id: Uuid,
    owner_id: Uuid,
    original_url: String,
    cleaned_url: String,
    hostname: Option<String>,
    title: Option<String>,
    excerpt: Option<String>,
    author: Option<String>,
    text_content: Option<String>,
    header_image_url: Option<String>,
    read_time_seconds: Option<i32>,
    summary: Option<String>,
    archive_path: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: row.id.into(),
            owner: row.owner_id.into(),
            original_url: row.original_url,
            cleaned_url: row.cleaned_url,
            hostname: row.hostname,
            title: row.title,
            excerpt: row.excerpt,
            author: row.author,
            text_content: row.text_content,
            header_image_url: row.header_image_url,
            read_time_seconds: row.read_time_seconds,
            summary: row.summary,
            archive_path: row.archive_path,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_feed(&self, feed: NewFeed) -> StoreResult<Feed> {
        let row: FeedRow = sqlx::query_as(
            r#"
            INSERT INTO feeds (id, owner_id, url, name, description, image_url, etag, last_modified, last_fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(FeedId::new().0)
        .bind(feed.owner.0)
        .bind(&feed.url)
        .bind(feed.name)
        .bind(feed.description)
        .bind(feed.image_url)
        .bind(feed.validators.etag.as_str())
        .bind(feed.validators.last_modified)
        .bind(feed.last_fetched_at)
        .fetch_one(&self.db)
        .await
        .map_err(backend)?;

        Ok(row.into())
    }

    async fn get_feed(&self, id: FeedId) -> StoreResult<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as("SELECT * FROM feeds WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await
            .map_err(backend)?;
        Ok(row.map(Feed::from))
    }

    async fn list_feeds(&self) -> StoreResult<Vec<Feed>> {
        let rows: Vec<FeedRow> = sqlx::query_as("SELECT * FROM feeds ORDER BY created_at")
            .fetch_all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Feed::from).collect())
    }

    async fn record_feed_fetch(
        &self,
        id: FeedId,
        validators: FetchValidators,
        fetched_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE feeds SET etag = $1, last_modified = $2, last_fetched_at = $3 WHERE id = $4",
        )
        .bind(validators.etag.as_str())
        .bind(validators.last_modified)
        .bind(fetched_at)
        .bind(id.0)
        .execute(&self.db)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(missing("feed", id));
        }
        Ok(())
    }

    async fn set_feed_auto_add(&self, id: FeedId, enabled: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE feeds SET auto_add_items_to_links = $1 WHERE id = $2")
            .bind(enabled)
            .bind(id.0)
            .execute(&self.db)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(missing("feed", id));
        }
        Ok(())
    }

    async fn find_feed_item(&self, feed: FeedId, guid: &str) -> StoreResult<Option<FeedItem>> {
        let row: Option<FeedItemRow> =
            sqlx::query_as("SELECT * FROM feed_items WHERE feed_id = $1 AND guid = $2")
                .bind(feed.0)
                .bind(guid)
                .fetch_optional(&self.db)
                .await
                .map_err(backend)?;
        Ok(row.map(FeedItem::from))
    }

    async fn insert_feed_item(&self, item: NewFeedItem) -> StoreResult<Option<FeedItem>> {
        let row: Option<FeedItemRow> = sqlx::query_as(
            r#"
            INSERT INTO feed_items (id, feed_id, owner_id, guid, title, description, url, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (feed_id, guid) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(FeedItemId::new().0)
        .bind(item.feed_id.0)
        .bind(item.owner.0)
        .bind(item.guid)
        .bind(item.title)
        .bind(item.description)
        .bind(item.url)
        .bind(item.published_at)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;

        Ok(row.map(FeedItem::from))
    }

    async fn get_feed_item(&self, id: FeedItemId) -> StoreResult<Option<FeedItem>> {
        let row: Option<FeedItemRow> = sqlx::query_as("SELECT * FROM feed_items WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await
            .map_err(backend)?;
        Ok(row.map(FeedItem::from))
    }

    async fn count_feed_items(&self, feed: FeedId) -> StoreResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feed_items WHERE feed_id = $1")
            .bind(feed.0)
            .fetch_one(&self.db)
            .await
            .map_err(backend)?;
        Ok(count as usize)
    }

    async fn insert_link(&self, link: NewLink) -> StoreResult<Link> {
        let row: LinkRow = sqlx::query_as(
            r#"
            INSERT INTO links (id, owner_id, original_url, cleaned_url, hostname, title, excerpt,
                               author, text_content, header_image_url, read_time_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(LinkId::new().0)
        .bind(link.owner.0)
        .bind(link.original_url)
        .bind(link.cleaned_url)
        .bind(link.hostname)
        .bind(link.title)
        .bind(link.excerpt)
        .bind(link.author)
        .bind(link.text_content)
        .bind(link.header_image_url)
        .bind(link.read_time_seconds)
        .fetch_one(&self.db)
        .await
        .map_err(backend)?;

        Ok(row.into())
    }

    async fn get_link(&self, id: LinkId) -> StoreResult<Option<Link>> {
        let row: Option<LinkRow> = sqlx::query_as("SELECT * FROM links WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await
            .map_err(backend)?;
        Ok(row.map(Link::from))
    }

    async fn set_link_summary(&self, id: LinkId, summary: String) -> StoreResult<()> {
        let result = sqlx::query("UPDATE links SET summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(id.0)
            .execute(&self.db)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(missing("link", id));
        }
        Ok(())
    }

    async fn set_link_archive(&self, id: LinkId, archive_path: String) -> StoreResult<()> {
        let result = sqlx::query("UPDATE links SET archive_path = $1 WHERE id = $2")
            .bind(archive_path)
            .bind(id.0)
            .execute(&self.db)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(missing("link", id));
        }
        Ok(())
    }
}
