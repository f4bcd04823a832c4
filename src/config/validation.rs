use crate::config::types::{
    Config, FetcherConfig, LearnerConfig, OrchestratorConfig, OutputConfig, SiteConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on the learning sample; more pages add fetch cost without
/// changing which rules survive.
const MAX_SAMPLE_SIZE: usize = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_learner_config(&config.learner)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_learner_config(config: &LearnerConfig) -> Result<(), ConfigError> {
    if config.sample_size < 1 || config.sample_size > MAX_SAMPLE_SIZE {
        return Err(ConfigError::Validation(format!(
            "sample-size must be between 1 and {}, got {}",
            MAX_SAMPLE_SIZE, config.sample_size
        )));
    }

    if !(config.min_confidence > 0.0 && config.min_confidence <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "min-confidence must be in (0, 1], got {}",
            config.min_confidence
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base-delay-ms ({}) cannot exceed max-delay-ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    if config.rate_limit_backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "rate-limit-backoff-factor must be >= 1.0, got {}",
            config.rate_limit_backoff_factor
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.id.is_empty()
        || !config
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site id must be non-empty and contain only letters, digits, '-' or '_', got '{}'",
            config.id
        )));
    }

    let base = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e))
    })?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.search_path.contains("{query}") {
        return Err(ConfigError::Validation(format!(
            "search-path '{}' must contain the {{query}} placeholder",
            config.search_path
        )));
    }

    validate_selector("product-link-selector", &config.product_link_selector)?;
    validate_selector("title-selector", &config.title_selector)?;
    validate_selector("description-selector", &config.description_selector)?;
    for (field, selector) in &config.fields {
        validate_selector(field, selector)?;
    }

    Ok(())
}

fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    if config.products_per_category < 1 {
        return Err(ConfigError::Validation(
            "products-per-category must be >= 1".to_string(),
        ));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("catalog-path", &config.catalog_path),
        ("output-dir", &config.output_dir),
        ("rules-dir", &config.rules_dir),
        ("checkpoint-path", &config.checkpoint_path),
        ("report-path", &config.report_path),
        ("library-path", &config.library_path),
    ];

    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "{} cannot be empty",
            name
        )));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e))
    })?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email.split_once('@').ok_or_else(|| {
        ConfigError::Validation(format!("Invalid contact-email format: '{}'", email))
    })?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid contact-email format: '{}'",
            email
        )));
    }

    Ok(())
}
