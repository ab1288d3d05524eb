//! Crawler module for page discovery and scraping
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with outcome classification
//! - The bounded retry loop shared by every fetch site
//! - Pagination discovery from the seed search page
//! - Page scraping with a bounded worker pool
//! - Per-keyword job coordination

mod coordinator;
mod driver;
mod fetcher;
mod pagination;
mod parser;
mod retry;

pub use coordinator::{Harvester, JobReport};
pub use driver::{CrawlDriver, CrawlStats, PageOutcome};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher};
pub use pagination::{select_pages, PaginationResolver, PAGE_TOKENS};
pub use parser::{ListingParser, PageParser, PaginationLink, ParseError};
pub use retry::{AttemptError, RetriesExhausted, RetryPolicy};

/// Seed of one crawl job
///
/// Immutable for the duration of the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Search keyword, e.g. "Myrtle Beach, South Carolina, United States"
    pub keyword: String,
    /// Locale forwarded to the proxy gateway
    pub locale: String,
    /// Maximum number of result pages, seed included
    pub max_pages: usize,
    /// Retries allowed after the first attempt of each page
    pub max_retries: u32,
}
