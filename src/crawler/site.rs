//! Configuration-driven product scraper for one site
//!
//! Searches the site for a category and fetches product pages together with
//! their basic fields (name, description and any configured extra fields).

use crate::config::SiteConfig;
use crate::crawler::fetcher::{FetchError, HttpFetcher};
use crate::crawler::html::{element_text, select_block_text, select_text};
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// A product link found on a search results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub url: String,
    /// Link text, used as the product name when the page has no title
    pub title: String,
}

/// Basic fields scraped from a product page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    /// Extra named fields from `[site.fields]`
    pub extra: BTreeMap<String, String>,
}

impl ProductFields {
    /// Looks up a field by name; `name`/`title` and `description` map to the basic fields
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "name" | "title" => Some(self.name.as_str()),
            "description" => Some(self.description.as_str()),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}

/// A fetched product page
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub url: String,
    pub html: String,
    pub fields: ProductFields,
}

impl ProductPage {
    /// Parses the page HTML
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// Scrapes one site using the selectors from its configuration
pub struct SiteScraper {
    id: String,
    base_url: Url,
    search_path: String,
    link_selector: Selector,
    title_selector: Selector,
    description_selector: Selector,
    field_selectors: BTreeMap<String, Selector>,
    fetcher: HttpFetcher,
}

impl SiteScraper {
    /// Creates a scraper from an (already validated) site configuration
    pub fn new(config: &SiteConfig, fetcher: HttpFetcher) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut field_selectors = BTreeMap::new();
        for (field, selector) in &config.fields {
            field_selectors.insert(field.clone(), compile(field, selector)?);
        }

        Ok(Self {
            id: config.id.clone(),
            base_url,
            search_path: config.search_path.clone(),
            link_selector: compile("product-link-selector", &config.product_link_selector)?,
            title_selector: compile("title-selector", &config.title_selector)?,
            description_selector: compile("description-selector", &config.description_selector)?,
            field_selectors,
            fetcher,
        })
    }

    /// Site identifier used in rule and log file names
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of HTTP requests sent to the site so far
    pub fn request_count(&self) -> u32 {
        self.fetcher.state().request_count
    }

    /// Builds the search URL for a category
    pub fn search_url(&self, category: &str) -> Result<Url, FetchError> {
        let query: String = url::form_urlencoded::byte_serialize(category.as_bytes()).collect();
        let path = self.search_path.replace("{query}", &query);
        self.base_url
            .join(&path)
            .map_err(|e| FetchError::InvalidUrl {
                url: path,
                message: e.to_string(),
            })
    }

    /// Searches the site for a category and returns up to `limit` product links
    ///
    /// Links are resolved against the search page URL and de-duplicated,
    /// keeping page order.
    pub async fn search(
        &mut self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductListing>, FetchError> {
        let search_url = self.search_url(category)?;
        tracing::debug!("Searching {} for '{}'", search_url, category);

        let body = self.fetcher.fetch(search_url.as_str()).await?;
        Ok(self.parse_listings(&body, &search_url, limit))
    }

    fn parse_listings(&self, body: &str, page_url: &Url, limit: usize) -> Vec<ProductListing> {
        let document = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for link in document.select(&self.link_selector) {
            if listings.len() >= limit {
                break;
            }

            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                continue;
            }

            let Ok(mut url) = page_url.join(href) else {
                continue;
            };
            url.set_fragment(None);
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }

            if seen.insert(url.to_string()) {
                listings.push(ProductListing {
                    url: url.to_string(),
                    title: element_text(link),
                });
            }
        }

        listings
    }

    /// Fetches a product page and scrapes its basic fields
    pub async fn fetch_product(
        &mut self,
        listing: &ProductListing,
    ) -> Result<ProductPage, FetchError> {
        let html = self.fetcher.fetch(&listing.url).await?;
        let fields = self.parse_fields(&html, listing);

        Ok(ProductPage {
            url: listing.url.clone(),
            html,
            fields,
        })
    }

    fn parse_fields(&self, html: &str, listing: &ProductListing) -> ProductFields {
        let document = Html::parse_document(html);

        let name = select_text(&document, &self.title_selector)
            .unwrap_or_else(|| listing.title.clone());
        let description =
            select_block_text(&document, &self.description_selector).unwrap_or_default();
        let extra = self
            .field_selectors
            .iter()
            .filter_map(|(field, selector)| {
                select_text(&document, selector).map(|value| (field.clone(), value))
            })
            .collect();

        ProductFields {
            name,
            description,
            extra,
        }
    }
}

fn compile(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}
