use crate::config::validation::validate;
use crate::ConfigResult;
use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Search keywords; each one is crawled as an independent job
    pub keywords: Vec<String>,
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl Config {
    /// Replaces the keyword list and re-validates the configuration
    ///
    /// Used for command-line keyword overrides, which bypass the checks
    /// applied when the file was loaded.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> ConfigResult<Self> {
        self.keywords = keywords;
        validate(&self)?;
        Ok(self)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Locale/country code forwarded to the proxy gateway
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Maximum number of result pages to crawl per keyword (seed included)
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Number of retries after the first attempt of any page fetch
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Maximum number of pages fetched concurrently
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Pause between two attempts on the same URL (milliseconds)
    #[serde(rename = "retry-delay-ms", default)]
    pub retry_delay_ms: u64,

    /// Per-attempt request deadline (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the listing site, used to resolve relative links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search path template; `{keyword}` is replaced by the keyword slug
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one CSV file per keyword
    pub directory: String,

    /// Number of buffered records that triggers a flush
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

/// Optional scraping proxy gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Gateway endpoint; the target URL is passed as a query parameter
    pub endpoint: String,

    /// Credential sent as the `api_key` query parameter
    #[serde(rename = "api-key")]
    pub api_key: String,
}

fn default_locale() -> String {
    "us".to_string()
}

fn default_max_workers() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("listing-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_search_path() -> String {
    "/s/{keyword}/homes".to_string()
}

fn default_batch_size() -> usize {
    50
}
