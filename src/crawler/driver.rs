//! Crawl driver - fetches result pages and feeds the pipeline
//!
//! Pages are scraped by a bounded pool of tokio tasks. With a single worker
//! pages are processed strictly in order. The first page that exhausts its
//! retry budget aborts every outstanding page of the job.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::PageParser;
use crate::crawler::retry::{AttemptError, RetryPolicy};
use crate::record::Record;
use crate::storage::{AddOutcome, DedupBuffer};
use crate::HarvestError;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// What one successfully scraped page contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Result cards found on the page
    pub found: usize,
    /// Cards accepted by the pipeline (not duplicates)
    pub accepted: usize,
}

/// Totals over every page of a crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages: usize,
    pub found: usize,
    pub accepted: usize,
}

impl CrawlStats {
    fn absorb(&mut self, page: PageOutcome) {
        self.pages += 1;
        self.found += page.found;
        self.accepted += page.accepted;
    }
}

/// Everything a worker needs to scrape one page
struct PageScraper {
    fetcher: Fetcher,
    parser: Arc<dyn PageParser>,
    base: Url,
}

impl PageScraper {
    async fn scrape(
        &self,
        url: Url,
        policy: RetryPolicy,
        pipeline: &DedupBuffer,
    ) -> Result<PageOutcome, HarvestError> {
        let fetcher = &self.fetcher;
        let parser = &self.parser;
        let target = url.as_str();

        let cards = policy
            .run(target, move |_| async move {
                let body = fetcher.fetch(target).await?;
                let cards = parser.extract_records(&body)?;
                Ok::<_, AttemptError>(cards)
            })
            .await
            .map_err(|exhausted| {
                tracing::error!(
                    url = %url,
                    retries = policy.max_retries,
                    "Max retries exceeded, giving up on page"
                );
                HarvestError::PageExhausted {
                    url: url.to_string(),
                    retries: policy.max_retries,
                    last_error: exhausted.last_error,
                }
            })?;

        // Submission starts only once the whole page is parsed
        let mut outcome = PageOutcome {
            found: cards.len(),
            accepted: 0,
        };
        for raw in cards {
            let record = Record::normalize(raw, &self.base);
            if pipeline.add(record)? != AddOutcome::Duplicate {
                outcome.accepted += 1;
            }
        }

        tracing::info!(
            url = %url,
            found = outcome.found,
            accepted = outcome.accepted,
            "Successfully parsed data from: {}",
            url
        );
        Ok(outcome)
    }
}

/// Fetches resolved pages and submits their records
pub struct CrawlDriver {
    scraper: Arc<PageScraper>,
    retry: RetryPolicy,
    workers: usize,
}

impl CrawlDriver {
    /// Creates a driver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared page fetcher
    /// * `parser` - Extracts result cards from page bodies
    /// * `base` - Site base URL used to resolve card links
    /// * `retry` - Default retry policy; `crawl` overrides its retry count
    /// * `workers` - Maximum pages in flight (at least one)
    pub fn new(
        fetcher: Fetcher,
        parser: Arc<dyn PageParser>,
        base: Url,
        retry: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            scraper: Arc::new(PageScraper {
                fetcher,
                parser,
                base,
            }),
            retry,
            workers: workers.max(1),
        }
    }

    /// Scrapes every URL and submits the records to `pipeline`
    ///
    /// Each URL has its own budget of `max_retries` retries. When a page
    /// exhausts it, outstanding pages are cancelled and the error is
    /// returned; the pipeline is left for the caller to close or abandon.
    pub async fn crawl(
        &self,
        urls: &[Url],
        max_retries: u32,
        pipeline: &Arc<DedupBuffer>,
    ) -> Result<CrawlStats, HarvestError> {
        let policy = RetryPolicy {
            max_retries,
            ..self.retry
        };
        let mut stats = CrawlStats::default();
        let mut tasks = JoinSet::new();

        for url in urls {
            while tasks.len() >= self.workers {
                if let Some(joined) = tasks.join_next().await {
                    match settle(joined) {
                        Ok(page) => stats.absorb(page),
                        Err(e) => {
                            tasks.shutdown().await;
                            return Err(e);
                        }
                    }
                }
            }

            let scraper = Arc::clone(&self.scraper);
            let pipeline = Arc::clone(pipeline);
            let url = url.clone();
            tasks.spawn(async move { scraper.scrape(url, policy, &pipeline).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match settle(joined) {
                Ok(page) => stats.absorb(page),
                Err(e) => {
                    tasks.shutdown().await;
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            pages = stats.pages,
            found = stats.found,
            accepted = stats.accepted,
            "Crawl finished"
        );
        Ok(stats)
    }
}

fn settle(
    joined: Result<Result<PageOutcome, HarvestError>, JoinError>,
) -> Result<PageOutcome, HarvestError> {
    joined?
}
