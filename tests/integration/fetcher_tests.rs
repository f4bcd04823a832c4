//! Fetcher retry behaviour and site scraping against a mock server

use crate::common::{fast_fetcher, html, product_page, search_page, site, user_agent};
use attribute_miner::crawler::{
    build_http_client, FetchError, HttpFetcher, ProductListing, RetryPolicy, SiteScraper,
};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32) -> HttpFetcher {
    let client = build_http_client(&user_agent(), Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        rate_limit_factor: 2.0,
    };
    HttpFetcher::with_client(client, policy, Duration::ZERO)
}

#[tokio::test]
async fn test_not_found_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = fetcher(3);
    let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

    assert!(matches!(result, Err(FetchError::NotFound { .. })));
    assert_eq!(fetcher.state().request_count, 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<html><body>ok</body></html>".to_string()))
        .mount(&server)
        .await;

    let mut fetcher = fetcher(3);
    let body = fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();

    assert!(body.contains("ok"));
    assert_eq!(fetcher.state().request_count, 2);
}

#[tokio::test]
async fn test_rate_limit_is_retried_and_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(html("<html><body>ok</body></html>".to_string()))
        .mount(&server)
        .await;

    let mut fetcher = fetcher(3);
    fetcher.fetch(&format!("{}/busy", server.uri())).await.unwrap();

    assert_eq!(fetcher.state().request_count, 2);
    assert_eq!(fetcher.state().rate_limit_hits, 1);
    assert!(!fetcher.state().rate_limited);
}

#[tokio::test]
async fn test_retries_are_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut fetcher = fetcher(2);
    let result = fetcher.fetch(&format!("{}/down", server.uri())).await;

    assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_non_html_content_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = fetcher(3);
    let result = fetcher.fetch(&format!("{}/image", server.uri())).await;

    assert!(matches!(result, Err(FetchError::ContentMismatch { .. })));
}

#[tokio::test]
async fn test_scraper_search_and_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Phone Cases"))
        .respond_with(html(search_page(&["/p/1", "/p/2", "/p/1", "#top", "/p/3"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(product_page("Acme", "30 g", "Silicone")))
        .mount(&server)
        .await;

    let http = HttpFetcher::new(&fast_fetcher(), &user_agent()).unwrap();
    let mut scraper = SiteScraper::new(&site(&server.uri()), http).unwrap();

    let listings = scraper.search("Phone Cases", 2).await.unwrap();
    let urls: Vec<&str> = listings.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/p/1", server.uri()),
            format!("{}/p/2", server.uri())
        ]
    );

    let page = scraper.fetch_product(&listings[0]).await.unwrap();
    assert_eq!(page.fields.name, "Acme Case");
    assert_eq!(page.fields.description, "Material: Silicone\nFits most phones");
    assert_eq!(scraper.request_count(), 2);
}

#[tokio::test]
async fn test_scraper_falls_back_to_link_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/9"))
        .respond_with(html("<html><body><p>No heading</p></body></html>".to_string()))
        .mount(&server)
        .await;

    let http = HttpFetcher::new(&fast_fetcher(), &user_agent()).unwrap();
    let mut scraper = SiteScraper::new(&site(&server.uri()), http).unwrap();
    let listing = ProductListing {
        url: format!("{}/p/9", server.uri()),
        title: "Linked Name".to_string(),
    };

    let page = scraper.fetch_product(&listing).await.unwrap();
    assert_eq!(page.fields.name, "Linked Name");
    assert!(page.fields.description.is_empty());
}
