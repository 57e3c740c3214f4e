use chrono::{DateTime, Utc};
use interfaces::{FetchValidators, StoreError};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Deadline for a whole request, body included.
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Largest response body any fetch will buffer.
    pub fn max_body_bytes(&self) -> usize {
        self.max_feed_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feedshelf/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Result of one conditional fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered 304; stored validators stay valid.
    Unchanged,
    Fetched {
        feed: ParsedFeed,
        validators: FetchValidators,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedEntry {
    pub guid: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Parse,
    Persistence,
    Authorization,
    NotFound,
    InvalidInput,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} exceeds {limit_bytes} bytes")]
    BodyTooLarge { url: String, limit_bytes: usize },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{caller} does not own {entity} {id}")]
    Forbidden {
        entity: &'static str,
        id: String,
        caller: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

impl AggregatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AggregatorError::Http(_)
            | AggregatorError::Timeout { .. }
            | AggregatorError::Status { .. }
            | AggregatorError::BodyTooLarge { .. } => ErrorKind::Transport,
            AggregatorError::Parse(_) => ErrorKind::Parse,
            AggregatorError::Store(_) | AggregatorError::Database(_) => ErrorKind::Persistence,
            AggregatorError::Forbidden { .. } => ErrorKind::Authorization,
            AggregatorError::NotFound { .. } => ErrorKind::NotFound,
            AggregatorError::InvalidUrl(_) | AggregatorError::UnsupportedScheme(_) => {
                ErrorKind::InvalidInput
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
