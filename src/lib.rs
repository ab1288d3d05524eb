//! Listing Harvester: a paginated search-result scraper
//!
//! This crate discovers the result pages of a keyword search on a listing
//! site, extracts one record per result card and persists the records to a
//! CSV file through a buffered, deduplicating pipeline.

pub mod config;
pub mod crawler;
pub mod record;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pagination discovery exhausted retries for {url} after {retries} retries: {last_error}")]
    PaginationExhausted {
        url: String,
        retries: u32,
        last_error: crawler::AttemptError,
    },

    #[error("Max retries exceeded for {url}: {retries} retries ({last_error})")]
    PageExhausted {
        url: String,
        retries: u32,
        last_error: crawler::AttemptError,
    },

    #[error("Page parser error: {0}")]
    Parser(#[from] crawler::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlRequest, Harvester, JobReport};
pub use record::{RawRecord, Record};
pub use storage::{CsvSink, DedupBuffer, Sink};
