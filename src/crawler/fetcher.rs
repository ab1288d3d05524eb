//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and deadlines
//! - Single-attempt GET requests returning the page body
//! - Error classification into transient and permanent failures
//!
//! The fetcher never retries on its own; retry orchestration belongs to
//! [`crate::crawler::RetryPolicy`] so every call site retries the same way.

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::url::proxied_url;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Whether a failed fetch is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Network trouble, server errors, throttling
    Transient,
    /// Client errors the server will keep returning
    Permanent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A failed fetch attempt
#[derive(Debug, Clone, Error)]
#[error("{kind} fetch failure for {url}: {cause}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    pub cause: String,
}

impl FetchError {
    fn from_status(url: &str, status: StatusCode) -> Self {
        let kind = if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            FetchErrorKind::Transient
        } else {
            FetchErrorKind::Permanent
        };

        Self {
            kind,
            url: url.to_string(),
            status: Some(status.as_u16()),
            cause: format!("Failed request, Status Code {}", status.as_u16()),
        }
    }

    fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let cause = if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else {
            error.to_string()
        };

        Self {
            kind: FetchErrorKind::Transient,
            url: url.to_string(),
            status: None,
            cause,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and deadlines)
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Stateless page fetcher
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    proxy: Option<ProxyConfig>,
    locale: String,
}

impl Fetcher {
    pub fn new(client: Client, proxy: Option<ProxyConfig>, locale: impl Into<String>) -> Self {
        Self {
            client,
            proxy,
            locale: locale.into(),
        }
    }

    /// Builds a fetcher from the crawler and proxy configuration
    pub fn from_config(
        crawler: &CrawlerConfig,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(crawler)?;
        Ok(Self::new(client, proxy.cloned(), crawler.locale.clone()))
    }

    /// Performs one GET request and returns the body of a 2xx response
    ///
    /// Logs one event per call with the resulting status.
    ///
    /// # Arguments
    ///
    /// * `url` - The target page; wrapped for the proxy gateway if one is set
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request_url = match &self.proxy {
            Some(proxy) => proxied_url(proxy, url, &self.locale)
                .map_err(|e| FetchError {
                    kind: FetchErrorKind::Permanent,
                    url: url.to_string(),
                    status: None,
                    cause: format!("Invalid proxy URL: {}", e),
                })?
                .to_string(),
            None => url.to_string(),
        };

        let response = match self.client.get(&request_url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = FetchError::from_reqwest(url, &e);
                tracing::info!(url = %url, error = %error.cause, "Request failed");
                return Err(error);
            }
        };

        let status = response.status();
        tracing::info!(url = %url, status = status.as_u16(), "Received [{}] from: {}", status.as_u16(), url);

        if !status.is_success() {
            return Err(FetchError::from_status(url, status));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))
    }
}
