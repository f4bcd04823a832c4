use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Attribute-Miner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub learner: LearnerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    pub output: OutputConfig,
}

/// Pattern learning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LearnerConfig {
    /// Number of product pages sampled when learning a category
    #[serde(rename = "sample-size", default = "default_sample_size")]
    pub sample_size: usize,

    /// Rules confirmed on fewer than this fraction of samples are discarded
    #[serde(rename = "min-confidence", default = "default_min_confidence")]
    pub min_confidence: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// HTTP fetch behaviour: timeouts, retries and per-site pacing
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds), doubled on every retry
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied to the backoff after an HTTP 429
    #[serde(
        rename = "rate-limit-backoff-factor",
        default = "default_rate_limit_backoff_factor"
    )]
    pub rate_limit_backoff_factor: f64,

    /// Minimum time between two requests to the site (milliseconds)
    #[serde(
        rename = "min-request-interval-ms",
        default = "default_min_request_interval_ms"
    )]
    pub min_request_interval_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            rate_limit_backoff_factor: default_rate_limit_backoff_factor(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// The site whose product pages are mined
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Short identifier used in rule and log file names (e.g. "amazon")
    pub id: String,

    /// Scheme and host all relative paths are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search path template; `{query}` is replaced by the encoded category name
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Selector for product links on the search results page
    #[serde(rename = "product-link-selector")]
    pub product_link_selector: String,

    /// Selector for the product name on a product page
    #[serde(rename = "title-selector")]
    pub title_selector: String,

    /// Selector for the product description on a product page
    #[serde(rename = "description-selector")]
    pub description_selector: String,

    /// Extra named fields (field name -> selector) scraped from product pages
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Batch orchestration settings
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum product pages fetched per category
    #[serde(
        rename = "products-per-category",
        default = "default_products_per_category"
    )]
    pub products_per_category: usize,

    /// A progress summary is logged every this many categories
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            products_per_category: default_products_per_category(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite catalog database (read-only)
    #[serde(rename = "catalog-path")]
    pub catalog_path: PathBuf,

    /// Directory for per-category run logs
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Directory holding one rule document per category/site
    #[serde(rename = "rules-dir")]
    pub rules_dir: PathBuf,

    /// Path to the checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: PathBuf,

    /// Path to the final run report
    #[serde(rename = "report-path")]
    pub report_path: PathBuf,

    /// Path to the consolidated rule library
    #[serde(rename = "library-path")]
    pub library_path: PathBuf,
}

fn default_sample_size() -> usize {
    5
}

fn default_min_confidence() -> f64 {
    0.4
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_rate_limit_backoff_factor() -> f64 {
    4.0
}

fn default_min_request_interval_ms() -> u64 {
    1500
}

fn default_products_per_category() -> usize {
    5
}

fn default_progress_interval() -> usize {
    10
}
