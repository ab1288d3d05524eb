use crate::config::{ProxyConfig, SiteConfig};
use crate::url::slugify_keyword;
use url::Url;

/// Builds the seed search URL for a keyword
///
/// The keyword slug is substituted into the site's search path template and
/// the result is joined onto the base URL.
///
/// # Example
///
/// ```
/// use listing_harvester::config::SiteConfig;
/// use listing_harvester::url::build_seed_url;
///
/// let site = SiteConfig {
///     base_url: "https://www.airbnb.com".to_string(),
///     search_path: "/s/{keyword}/homes".to_string(),
/// };
/// let url = build_seed_url(&site, "Austin, Texas").unwrap();
/// assert_eq!(url.as_str(), "https://www.airbnb.com/s/Austin--Texas/homes");
/// ```
pub fn build_seed_url(site: &SiteConfig, keyword: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(&site.base_url)?;
    let path = site
        .search_path
        .replace("{keyword}", &slugify_keyword(keyword));
    base.join(&path)
}

/// Resolves a link href found on a page to an absolute URL
///
/// Returns None for empty hrefs, fragment-only anchors, non-HTTP schemes and
/// anything that fails to parse.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}

/// Wraps a target URL in the proxy gateway's query format
///
/// The gateway receives `api_key`, the target `url` and the `country` to
/// route through.
pub fn proxied_url(proxy: &ProxyConfig, target: &str, locale: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&proxy.endpoint)?;
    url.query_pairs_mut()
        .append_pair("api_key", &proxy.api_key)
        .append_pair("url", target)
        .append_pair("country", locale);
    Ok(url)
}
