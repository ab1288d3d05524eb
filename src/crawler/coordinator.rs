//! Harvest coordinator - per-keyword job orchestration
//!
//! This module wires the components of one crawl job together:
//! - Resolving the result pages of a keyword
//! - Opening the keyword's CSV pipeline
//! - Driving the page crawl
//! - Closing the pipeline, or abandoning it when the crawl aborts

use crate::config::Config;
use crate::crawler::driver::{CrawlDriver, CrawlStats};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::PaginationResolver;
use crate::crawler::parser::{ListingParser, PageParser};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::CrawlRequest;
use crate::storage::{open_csv_pipeline, output_path, PipelineStats};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Outcome of a completed keyword job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub keyword: String,
    /// CSV file the records were written to
    pub output: PathBuf,
    pub crawl: CrawlStats,
    pub pipeline: PipelineStats,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Runs crawl jobs for the keywords of one configuration
///
/// Holds the job context shared by every keyword: configuration, HTTP
/// client and page parser. Pipelines are per keyword, so seen names never
/// leak from one job into the next.
pub struct Harvester {
    config: Arc<Config>,
    resolver: PaginationResolver,
    driver: CrawlDriver,
}

impl Harvester {
    /// Creates a harvester using the default [`ListingParser`]
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let parser = Arc::new(ListingParser::new()?);
        Self::with_parser(config, parser)
    }

    /// Creates a harvester with a custom page parser
    pub fn with_parser(config: Config, parser: Arc<dyn PageParser>) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(&config.crawler, config.proxy.as_ref())?;
        let base = Url::parse(&config.site.base_url)?;
        let retry = RetryPolicy::new(
            config.crawler.max_retries,
            Duration::from_millis(config.crawler.retry_delay_ms),
        );

        let resolver = PaginationResolver::new(
            fetcher.clone(),
            Arc::clone(&parser),
            config.site.clone(),
            retry,
        );
        let driver = CrawlDriver::new(fetcher, parser, base, retry, config.crawler.max_workers);

        Ok(Self {
            config: Arc::new(config),
            resolver,
            driver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the crawl request for a keyword from the configuration
    pub fn request_for(&self, keyword: &str) -> CrawlRequest {
        CrawlRequest {
            keyword: keyword.trim().to_string(),
            locale: self.config.crawler.locale.clone(),
            max_pages: self.config.crawler.max_pages,
            max_retries: self.config.crawler.max_retries,
        }
    }

    /// Output file of a keyword
    pub fn output_for(&self, keyword: &str) -> PathBuf {
        output_path(Path::new(&self.config.output.directory), keyword)
    }

    /// Runs the crawl job of a single keyword
    ///
    /// Nothing is written when pagination discovery fails. When a page
    /// exhausts its retries, batches flushed before the failure stay in the
    /// output file and buffered records are discarded.
    pub async fn run_keyword(&self, keyword: &str) -> Result<JobReport, HarvestError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let request = self.request_for(keyword);
        let output = self.output_for(keyword);

        tracing::info!(keyword = %request.keyword, locale = %request.locale, "Starting keyword job");

        let urls = self.resolver.resolve(&request).await?;
        let pipeline = Arc::new(open_csv_pipeline(&output, self.config.output.batch_size)?);

        let crawl = match self.driver.crawl(&urls, request.max_retries, &pipeline).await {
            Ok(crawl) => crawl,
            Err(e) => {
                match pipeline.abandon() {
                    Ok(discarded) => tracing::warn!(
                        keyword = %request.keyword,
                        discarded,
                        "Discarded unflushed records of aborted job"
                    ),
                    Err(close_err) => tracing::warn!(
                        keyword = %request.keyword,
                        "Failed to abandon pipeline: {}",
                        close_err
                    ),
                }
                tracing::error!(keyword = %request.keyword, "Aborting keyword job: {}", e);
                return Err(e);
            }
        };

        let stats = pipeline.close()?;
        let report = JobReport {
            keyword: request.keyword,
            output,
            crawl,
            pipeline: stats,
            started_at,
            elapsed: timer.elapsed(),
        };

        tracing::info!(
            keyword = %report.keyword,
            pages = report.crawl.pages,
            written = report.pipeline.written,
            duplicates = report.pipeline.duplicates,
            "Keyword job complete in {:?}",
            report.elapsed
        );
        Ok(report)
    }

    /// Runs every configured keyword in order
    ///
    /// A failed keyword does not stop the remaining ones; every outcome is
    /// returned alongside its keyword.
    pub async fn run_all(&self) -> Vec<(String, Result<JobReport, HarvestError>)> {
        let keywords = self.config.keywords.clone();
        self.run_keywords(&keywords).await
    }

    /// Runs the given keywords in order
    pub async fn run_keywords(
        &self,
        keywords: &[String],
    ) -> Vec<(String, Result<JobReport, HarvestError>)> {
        tracing::info!("Crawl starting...");
        let mut outcomes = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let outcome = self.run_keyword(keyword).await;
            outcomes.push((keyword.clone(), outcome));
        }
        tracing::info!("Crawl complete.");
        outcomes
    }
}
