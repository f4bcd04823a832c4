use std::time::{Duration, Instant};

/// Tracks request pacing for the one site a fetcher talks to
///
/// The fetcher owns exactly one `SiteState`, so no two workers ever share a
/// site's request budget.
#[derive(Debug, Clone, Default)]
pub struct SiteState {
    /// Number of requests made to this site in the current run
    pub request_count: u32,

    /// Timestamp of the last request to this site
    pub last_request_time: Option<Instant>,

    /// Whether the last response from this site was HTTP 429
    pub rate_limited: bool,

    /// Number of HTTP 429 responses seen in the current run
    pub rate_limit_hits: u32,
}

impl SiteState {
    /// Creates a new SiteState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be made to this site right now
    ///
    /// # Arguments
    ///
    /// * `min_interval` - Minimum time between two requests
    /// * `now` - The current time instant
    pub fn can_request(&self, min_interval: Duration, now: Instant) -> bool {
        self.time_until_next_request(min_interval, now).is_none()
    }

    /// Records that a request was made to this site
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Marks this site as rate limited
    pub fn mark_rate_limited(&mut self) {
        self.rate_limited = true;
        self.rate_limit_hits += 1;
    }

    /// Clears the rate limited flag after a successful response
    pub fn clear_rate_limit(&mut self) {
        self.rate_limited = false;
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_interval {
            Some(min_interval - elapsed)
        } else {
            None
        }
    }
}
