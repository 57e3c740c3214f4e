use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(UserId);
id_type!(FeedId);
id_type!(FeedItemId);
id_type!(LinkId);

/// Cache validator handed out by a remote server (an entity tag).
///
/// Only ever echoed back to the server that issued it. The empty token is a
/// legitimate value meaning "the server sent none".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorToken(String);

impl ValidatorToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ValidatorToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Validators written back to a feed after every fetch that produced a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchValidators {
    pub etag: ValidatorToken,
    /// Raw `Last-Modified` header value, empty when absent.
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub owner: UserId,
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub validators: FetchValidators,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub auto_add_items_to_links: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeed {
    pub owner: UserId,
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub validators: FetchValidators,
    pub last_fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: FeedItemId,
    pub feed_id: FeedId,
    pub owner: UserId,
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedItem {
    pub feed_id: FeedId,
    pub owner: UserId,
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub owner: UserId,
    pub original_url: String,
    pub cleaned_url: String,
    pub hostname: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub text_content: Option<String>,
    pub header_image_url: Option<String>,
    pub read_time_seconds: Option<i32>,
    pub summary: Option<String>,
    pub archive_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    pub owner: UserId,
    pub original_url: String,
    pub cleaned_url: String,
    pub hostname: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub text_content: Option<String>,
    pub header_image_url: Option<String>,
    pub read_time_seconds: Option<i32>,
}

/// Entities whose creation triggers background enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatedEntity {
    Link(LinkId),
    FeedItem(FeedItemId),
}

// Object style note:
// Capability implementations (Store, Summarizer, Archiver, FeedItemConverter)
// are shared behind `Arc<dyn ...>` between the scheduler loop and every
// in-flight enrichment task, so they take `&self` and carry no per-call state.
// Identity is always passed by id; implementations load what they need.
