//! Crawler module for fetching product pages
//!
//! This module contains the site-facing side of the miner:
//! - HTTP fetching with per-site pacing and retry/backoff
//! - Search and product page scraping driven by site configuration
//! - HTML text helpers shared with the learner and extractor

mod fetcher;
pub mod html;
mod site;

pub use fetcher::{build_http_client, FetchError, HttpFetcher, RetryPolicy};
pub use site::{ProductFields, ProductListing, ProductPage, SiteScraper};
