//! Pagination discovery
//!
//! Turns a keyword into the ordered list of result pages to crawl: the seed
//! search page first, followed by the pages linked from its pagination bar.

use crate::config::SiteConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{PageParser, PaginationLink};
use crate::crawler::retry::{AttemptError, RetryPolicy};
use crate::crawler::CrawlRequest;
use crate::url::{build_seed_url, resolve_href};
use crate::{ConfigError, HarvestError};
use std::sync::Arc;
use url::Url;

/// Pagination labels worth following
///
/// The bar also shows "Next", ellipses and far-away page numbers; only the
/// first few numbered pages are crawled.
pub const PAGE_TOKENS: [&str; 4] = ["1", "2", "3", "4"];

/// Resolves the page URLs of a keyword search
pub struct PaginationResolver {
    fetcher: Fetcher,
    parser: Arc<dyn PageParser>,
    site: SiteConfig,
    retry: RetryPolicy,
}

impl PaginationResolver {
    pub fn new(
        fetcher: Fetcher,
        parser: Arc<dyn PageParser>,
        site: SiteConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            parser,
            site,
            retry,
        }
    }

    /// Fetches the seed page and returns the URLs to crawl
    ///
    /// The result always starts with the seed URL and holds at most
    /// `request.max_pages` entries. A parser that cannot find the pagination
    /// bar consumes the retry budget like a failed fetch.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Url>)` - Non-empty, seed first
    /// * `Err(HarvestError::PaginationExhausted)` - Every attempt failed
    /// * `Err(HarvestError::Config)` - `max_pages` is zero; nothing is fetched
    pub async fn resolve(&self, request: &CrawlRequest) -> Result<Vec<Url>, HarvestError> {
        if request.max_pages == 0 {
            return Err(ConfigError::Validation(
                "max_pages must be >= 1, got 0".to_string(),
            )
            .into());
        }

        let seed = build_seed_url(&self.site, &request.keyword)?;
        let base = Url::parse(&self.site.base_url)?;
        let policy = RetryPolicy {
            max_retries: request.max_retries,
            ..self.retry
        };

        let fetcher = &self.fetcher;
        let parser = &self.parser;
        let target = seed.as_str();

        let links = policy
            .run(target, move |_| async move {
                let body = fetcher.fetch(target).await?;
                let links = parser.extract_pagination(&body)?;
                Ok::<_, AttemptError>(links)
            })
            .await
            .map_err(|exhausted| {
                tracing::error!(
                    "Failed to find pagination for {}, max retries exceeded",
                    seed
                );
                HarvestError::PaginationExhausted {
                    url: seed.to_string(),
                    retries: request.max_retries,
                    last_error: exhausted.last_error,
                }
            })?;

        let urls = select_pages(seed, &base, &links, request.max_pages);
        tracing::info!(
            keyword = %request.keyword,
            pages = urls.len(),
            "Resolved result pages"
        );
        Ok(urls)
    }
}

/// Builds the capped page list from the seed and the pagination links
///
/// The seed is always included, so the result holds `max(max_pages, 1)`
/// entries at most; [`PaginationResolver::resolve`] rejects a zero cap.
/// Links whose label is not one of [`PAGE_TOKENS`], that cannot be
/// resolved, or that point at a page already listed are skipped.
pub fn select_pages(seed: Url, base: &Url, links: &[PaginationLink], max_pages: usize) -> Vec<Url> {
    let mut pages = vec![seed];

    for link in links {
        if pages.len() >= max_pages {
            break;
        }
        let label = link.label.trim();
        if !PAGE_TOKENS.iter().any(|token| *token == label) {
            continue;
        }
        if let Some(url) = resolve_href(base, &link.href) {
            if !pages.contains(&url) {
                pages.push(url);
            }
        }
    }

    pages
}
