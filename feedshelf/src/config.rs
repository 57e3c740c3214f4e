use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::dispatch::DispatchConfig;
use crate::scheduler::DEFAULT_SYNC_INTERVAL;
use crate::types::FetchConfig;

const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub sync_interval: Duration,
    pub fetch: FetchConfig,
    pub dispatch: DispatchConfig,
    /// Archiving is disabled when unset.
    pub archive_dir: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub summary_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow!("Missing DATABASE_URL env var"))?;

        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            timeout_seconds: parse_var("FEEDSHELF_FETCH_TIMEOUT_SECS", defaults.timeout_seconds)?,
            ..defaults
        };

        let dispatch = DispatchConfig {
            max_concurrent_tasks: parse_var(
                "FEEDSHELF_MAX_TASKS",
                DispatchConfig::default().max_concurrent_tasks,
            )?,
        };

        let sync_secs = parse_var("FEEDSHELF_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL.as_secs())?;
        if sync_secs == 0 {
            return Err(anyhow!("FEEDSHELF_SYNC_INTERVAL_SECS must be positive"));
        }

        Ok(Self {
            database_url,
            sync_interval: Duration::from_secs(sync_secs),
            fetch,
            dispatch,
            archive_dir: non_empty_var("FEEDSHELF_ARCHIVE_DIR").map(PathBuf::from),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            summary_model: non_empty_var("FEEDSHELF_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
