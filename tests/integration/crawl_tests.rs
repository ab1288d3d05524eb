//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock listing sites and exercise
//! pagination discovery, page scraping and the CSV pipeline end-to-end.

use listing_harvester::config::{Config, CrawlerConfig, OutputConfig, ProxyConfig, SiteConfig};
use listing_harvester::crawler::{
    AttemptError, CrawlRequest, Fetcher, ListingParser, PaginationResolver, RetryPolicy,
};
use listing_harvester::{Harvester, HarvestError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEED_PATH: &str = "/s/Rome/homes";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    Config {
        keywords: vec!["Rome".to_string()],
        crawler: CrawlerConfig {
            locale: "us".to_string(),
            max_pages: 4,
            max_retries: 3,
            max_workers: 1,
            retry_delay_ms: 0,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            user_agent: "TestHarvester/1.0".to_string(),
        },
        site: SiteConfig {
            base_url: base_url.to_string(),
            search_path: "/s/{keyword}/homes".to_string(),
        },
        output: OutputConfig {
            directory: output_dir.display().to_string(),
            batch_size: 50,
        },
        proxy: None,
    }
}

fn request(max_pages: usize, max_retries: u32) -> CrawlRequest {
    CrawlRequest {
        keyword: "Rome".to_string(),
        locale: "us".to_string(),
        max_pages,
        max_retries,
    }
}

fn resolver(config: &Config) -> PaginationResolver {
    let fetcher = Fetcher::from_config(&config.crawler, None).expect("Failed to build fetcher");
    PaginationResolver::new(
        fetcher,
        Arc::new(ListingParser::new().expect("Failed to build parser")),
        config.site.clone(),
        RetryPolicy::new(config.crawler.max_retries, Duration::ZERO),
    )
}

fn pagination(labels: &[&str]) -> String {
    let links: String = labels
        .iter()
        .map(|label| format!(r#"<a href="/page/{label}">{label}</a>"#))
        .collect();
    format!(r#"<nav aria-label="Search results pagination">{links}<a href="/page/2">Next</a></nav>"#)
}

fn card(name: &str, price: &str) -> String {
    format!(
        r#"<div data-testid="card-container">
            <a href="/rooms/{slug}">view</a>
            <div data-testid="listing-card-title">  Apartment in Rome </div>
            <div data-testid="listing-card-subtitle"> {name} </div>
            <div data-testid="listing-card-subtitle">Oct 1 - 6</div>
            <span><div><span>{price}</span></div></span>
        </div>"#,
        slug = name.replace(' ', "-"),
    )
}

fn page(nav: &str, cards: &[String]) -> String {
    format!("<html><body>{}{}</body></html>", nav, cards.concat())
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("Failed to open output");
    reader
        .records()
        .map(|r| {
            r.expect("Malformed CSV row")
                .iter()
                .map(|field| field.to_string())
                .collect()
        })
        .collect()
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_resolver_caps_pages_and_keeps_seed_first() {
    let mock_server = MockServer::start().await;
    let labels = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];
    mount_page(&mock_server, SEED_PATH, page(&pagination(&labels), &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let urls = resolver(&config)
        .resolve(&request(4, 3))
        .await
        .expect("Resolution failed");

    assert_eq!(urls.len(), 4);
    assert_eq!(urls[0].as_str(), format!("{}{}", mock_server.uri(), SEED_PATH));
    assert_eq!(urls[1].path(), "/page/1");
    assert_eq!(urls[3].path(), "/page/3");
}

#[tokio::test]
async fn test_resolver_succeeds_on_last_allowed_attempt() {
    let mock_server = MockServer::start().await;

    // First three attempts fail, the fourth succeeds
    Mock::given(method("GET"))
        .and(path(SEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, SEED_PATH, page(&pagination(&["2"]), &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let urls = resolver(&config)
        .resolve(&request(4, 3))
        .await
        .expect("Fourth attempt should succeed with three retries");

    assert_eq!(urls.len(), 2);
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 4);
}

#[tokio::test]
async fn test_resolver_exhausts_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let result = resolver(&config).resolve(&request(4, 2)).await;

    match result {
        Err(HarvestError::PaginationExhausted { url, retries, .. }) => {
            assert!(url.ends_with(SEED_PATH));
            assert_eq!(retries, 2);
        }
        other => panic!("Expected PaginationExhausted, got {:?}", other),
    }
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 3);
}

#[tokio::test]
async fn test_missing_pagination_bar_consumes_retries() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page("", &[card("Loft", "$90")]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let result = resolver(&config).resolve(&request(4, 1)).await;

    match result {
        Err(HarvestError::PaginationExhausted { last_error, .. }) => {
            assert!(matches!(last_error, AttemptError::Parse(_)));
        }
        other => panic!("Expected PaginationExhausted, got {:?}", other),
    }
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 2);
}

#[tokio::test]
async fn test_full_harvest_single_keyword() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        page(
            &pagination(&["1", "2"]),
            &[card("Loft near Colosseum", "$120"), card("Trastevere flat", "$95")],
        ),
    )
    .await;
    // Page 1 repeats the seed's first card
    mount_page(
        &mock_server,
        "/page/1",
        page(
            &pagination(&["1", "2"]),
            &[card("Loft near Colosseum", "$999"), card("Villa Borghese studio", "")],
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page/2",
        page(&pagination(&["1", "2"]), &[card("Monti room", "$60")]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let harvester = Harvester::new(config).expect("Failed to create harvester");
    let report = harvester.run_keyword("Rome").await.expect("Harvest failed");

    assert_eq!(report.crawl.pages, 3);
    assert_eq!(report.crawl.found, 5);
    assert_eq!(report.pipeline.written, 4);
    assert_eq!(report.pipeline.duplicates, 1);
    assert_eq!(report.output, dir.path().join("Rome.csv"));

    let rows = read_csv(&report.output);
    assert_eq!(rows[0], vec!["name", "description", "dates", "price", "url"]);
    assert_eq!(rows.len(), 5);

    // First-seen wins
    let loft = rows.iter().find(|r| r[0] == "Loft near Colosseum").unwrap();
    assert_eq!(loft[3], "$120");

    // Fields trimmed, empty price replaced, link absolute
    let studio = rows.iter().find(|r| r[0] == "Villa Borghese studio").unwrap();
    assert_eq!(studio[1], "Apartment in Rome");
    assert_eq!(studio[3], "No price");
    assert_eq!(
        studio[4],
        format!("{}/rooms/Villa-Borghese-studio", mock_server.uri())
    );

    for row in &rows[1..] {
        for field in row {
            assert!(!field.is_empty());
            assert_eq!(field, field.trim());
        }
    }
}

#[tokio::test]
async fn test_page_without_cards_is_success() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page(&pagination(&["2"]), &[card("Loft", "$90")]),
    )
    .await;
    mount_page(&mock_server, "/page/2", page(&pagination(&["2"]), &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let harvester = Harvester::new(config).unwrap();
    let report = harvester.run_keyword("Rome").await.expect("Harvest failed");

    assert_eq!(report.crawl.pages, 2);
    assert_eq!(report.crawl.found, 1);
    assert_eq!(report.pipeline.written, 1);
    assert_eq!(requests_to(&mock_server, "/page/2").await, 1);
}

#[tokio::test]
async fn test_failing_page_aborts_keyword() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page(&pagination(&["2", "3"]), &[card("Loft", "$90"), card("Flat", "$80")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/page/3", page("", &[card("Villa", "$300")])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.max_retries = 2;
    // Flush after every record so the seed page's records reach the file
    config.output.batch_size = 1;

    let harvester = Harvester::new(config).unwrap();
    let result = harvester.run_keyword("Rome").await;

    match result {
        Err(HarvestError::PageExhausted { url, retries, .. }) => {
            assert!(url.ends_with("/page/2"));
            assert_eq!(retries, 2);
        }
        other => panic!("Expected PageExhausted, got {:?}", other),
    }

    // Fail-fast: the page after the failing one is never requested
    assert_eq!(requests_to(&mock_server, "/page/2").await, 3);
    assert_eq!(requests_to(&mock_server, "/page/3").await, 0);

    let rows = read_csv(&dir.path().join("Rome.csv"));
    let names: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, vec!["Loft", "Flat"]);
}

#[tokio::test]
async fn test_aborted_keyword_discards_unflushed_records() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page(&pagination(&["2"]), &[card("Loft", "$90")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.max_retries = 0;

    let harvester = Harvester::new(config).unwrap();
    assert!(harvester.run_keyword("Rome").await.is_err());

    // Nothing reached the batch size, so nothing was ever written
    assert!(!dir.path().join("Rome.csv").exists());
}

#[tokio::test]
async fn test_parallel_workers_keep_one_record_per_name() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page(
            &pagination(&["1", "2", "3", "4"]),
            &[card("Shared", "$1"), card("Seed only", "$2")],
        ),
    )
    .await;
    for n in 1..=4 {
        mount_page(
            &mock_server,
            &format!("/page/{}", n),
            page(
                "",
                &[card("Shared", &format!("${}", n)), card(&format!("Unique {}", n), "$5")],
            ),
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.max_pages = 5;
    config.crawler.max_workers = 4;
    config.output.batch_size = 2;

    let harvester = Harvester::new(config).unwrap();
    let report = harvester.run_keyword("Rome").await.expect("Harvest failed");

    assert_eq!(report.crawl.pages, 5);
    assert_eq!(report.pipeline.written, 6);
    assert_eq!(report.pipeline.duplicates, 4);

    let rows = read_csv(&report.output);
    assert_eq!(rows.len(), 7);
    assert_eq!(rows.iter().filter(|r| r[0] == "Shared").count(), 1);
    assert_eq!(rows.iter().filter(|r| r[0] == "name").count(), 1);
}

#[tokio::test]
async fn test_run_all_continues_after_failed_keyword() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        page(&pagination(&[]), &[card("Loft", "$90")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/s/Milan/homes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.keywords = vec!["Milan".to_string(), "Rome".to_string()];
    config.crawler.max_retries = 0;

    let harvester = Harvester::new(config).unwrap();
    let outcomes = harvester.run_all().await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].0, "Milan");
    assert!(matches!(
        outcomes[0].1,
        Err(HarvestError::PaginationExhausted { .. })
    ));
    let rome = outcomes[1].1.as_ref().expect("Rome should succeed");
    assert_eq!(rome.pipeline.written, 1);
    assert!(!dir.path().join("Milan.csv").exists());
}

#[tokio::test]
async fn test_requests_go_through_proxy_gateway() {
    let mock_server = MockServer::start().await;
    let seed = "https://listings.example.com/s/Rome/homes";

    // Seed is fetched once for discovery and once for its records
    Mock::given(method("GET"))
        .and(path("/gateway"))
        .and(query_param("api_key", "secret"))
        .and(query_param("url", seed))
        .and(query_param("country", "it"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(&pagination(&[]), &[card("Loft", "$90")])),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config("https://listings.example.com", dir.path());
    config.crawler.locale = "it".to_string();
    config.crawler.max_retries = 0;
    config.proxy = Some(ProxyConfig {
        endpoint: format!("{}/gateway", mock_server.uri()),
        api_key: "secret".to_string(),
    });

    let harvester = Harvester::new(config).unwrap();
    let report = harvester
        .run_keyword("Rome")
        .await
        .expect("Harvest through proxy failed");

    assert_eq!(report.pipeline.written, 1);
    let rows = read_csv(&report.output);
    assert_eq!(rows[1][4], "https://listings.example.com/rooms/Loft");
}
