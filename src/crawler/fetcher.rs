//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the miner, including:
//! - Building HTTP clients with proper user agent strings
//! - Pacing requests to a single site
//! - Capped exponential backoff with jitter for transient failures
//! - Error classification

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::state::SiteState;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Typed failure of a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("rate limited (HTTP 429): {url}")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("unexpected content type '{content_type}' from {url}")]
    ContentMismatch { url: String, content_type: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    /// Returns true if the request may succeed when retried
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404 | Fail fast |
    /// | HTTP 429 | Retry with the rate-limit backoff |
    /// | HTTP 5xx | Retry |
    /// | Timeout / connection error | Retry |
    /// | Other HTTP status | Fail fast |
    /// | Non-HTML content / bad URL | Fail fast |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::NotFound { .. } | Self::ContentMismatch { .. } | Self::InvalidUrl { .. } => false,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use attribute_miner::config::UserAgentConfig;
/// use attribute_miner::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "AttributeMiner".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Backoff schedule for retried requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub rate_limit_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            rate_limit_factor: config.rate_limit_backoff_factor,
        }
    }

    /// Delay before retry number `retry` (1-based), before jitter
    ///
    /// The base delay doubles on every retry, is multiplied by the rate-limit
    /// factor after a 429, and is capped at `max_delay`.
    pub fn backoff(&self, retry: u32, rate_limited: bool) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        let mut millis = self.base_delay.as_millis() as f64 * 2f64.powi(exponent);
        if rate_limited {
            millis *= self.rate_limit_factor;
        }
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Backoff with a 50%-150% jitter applied, never above `max_delay`
    pub fn delay_for(&self, retry: u32, rate_limited: bool) -> Duration {
        let jitter = 0.5 + fastrand::f64();
        self.backoff(retry, rate_limited)
            .mul_f64(jitter)
            .min(self.max_delay)
    }
}

/// Rate-limited, retrying fetcher for a single site
///
/// All requests to one site go through one `HttpFetcher`, which owns the
/// site's pacing state. Requests are sequential.
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    min_interval: Duration,
    state: SiteState,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(
            client,
            RetryPolicy::from_config(config),
            Duration::from_millis(config.min_request_interval_ms),
        ))
    }

    pub fn with_client(client: Client, policy: RetryPolicy, min_interval: Duration) -> Self {
        Self {
            client,
            policy,
            min_interval,
            state: SiteState::new(),
        }
    }

    /// Pacing state of the site this fetcher talks to
    pub fn state(&self) -> &SiteState {
        &self.state
    }

    /// Fetches a page body, retrying transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(FetchError)` - The last failure once retries are exhausted, or
    ///   the first non-retryable failure
    pub async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        let mut retry = 0;

        loop {
            self.wait_for_slot().await;
            self.state.record_request(Instant::now());

            let error = match fetch_once(&self.client, url).await {
                Ok(body) => {
                    self.state.clear_rate_limit();
                    return Ok(body);
                }
                Err(e) => e,
            };

            let rate_limited = matches!(error, FetchError::RateLimited { .. });
            if rate_limited {
                self.state.mark_rate_limited();
            }

            if !error.is_retryable() || retry >= self.policy.max_retries {
                return Err(error);
            }

            retry += 1;
            let delay = self.policy.delay_for(retry, rate_limited);
            tracing::warn!(
                "{} (retry {}/{} in {:?})",
                error,
                retry,
                self.policy.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn wait_for_slot(&self) {
        if let Some(wait) = self
            .state
            .time_until_next_request(self.min_interval, Instant::now())
        {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Sends one GET request and classifies the outcome
async fn fetch_once(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_transport_error(url, e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            url: url.to_string(),
        });
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if !content_type.is_empty() && !content_type.contains("html") && !content_type.contains("xml")
    {
        return Err(FetchError::ContentMismatch {
            url: url.to_string(),
            content_type,
        });
    }

    response
        .text()
        .await
        .map_err(|e| classify_transport_error(url, e))
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
