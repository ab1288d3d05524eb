//! Count-bounded retry loop shared by page discovery and page scraping
//!
//! An attempt covers fetching a page *and* parsing it: a page that was
//! fetched but lacks the expected structure consumes the same budget as a
//! network failure.

use crate::crawler::fetcher::FetchError;
use crate::crawler::parser::ParseError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single attempt
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Every allowed attempt failed
#[derive(Debug, Clone, Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetriesExhausted {
    pub attempts: u32,
    pub last_error: AttemptError,
}

/// Retry budget for one URL
///
/// `max_retries` counts attempts beyond the first, so a URL gets at most
/// `max_retries + 1` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total number of attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Runs `attempt` until it succeeds or the budget is spent
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, RetriesExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let max_attempts = self.max_attempts();
        let mut number = 1;

        loop {
            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let left = max_attempts - number;
                    tracing::warn!(
                        url = %url,
                        attempt = number,
                        retries_left = left,
                        "Attempt failed: {}",
                        error
                    );

                    if left == 0 {
                        return Err(RetriesExhausted {
                            attempts: number,
                            last_error: error,
                        });
                    }
                }
            }

            number += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}
