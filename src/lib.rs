//! Attribute-Miner: learns and applies product attribute extraction rules
//!
//! This crate learns per-site extraction rules for product categories from a
//! handful of sample pages, applies them to turn unstructured product pages
//! into attribute maps validated against a catalog schema, consolidates rules
//! across categories, and drives the whole pipeline as a resumable batch.

pub mod catalog;
pub mod config;
pub mod consolidate;
pub mod crawler;
pub mod extractor;
pub mod learner;
pub mod orchestrator;
pub mod output;
pub mod rules;
pub mod state;

use thiserror::Error;

/// Main error type for Attribute-Miner operations
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Rule store error: {0}")]
    Rules(#[from] rules::RuleError),

    #[error("Failed to persist checkpoint {path}: {source}")]
    Checkpoint {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CategoryState,
        to: state::CategoryState,
    },

    #[error("Site error for {site}: {message}")]
    Site { site: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Attribute-Miner operations
pub type Result<T> = std::result::Result<T, MinerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extractor::{validate, AttributeExtractor, ExtractedAttributeMap, ValidationReport};
pub use learner::{LearnOutcome, PatternLearner};
pub use rules::{ExtractionRule, RuleMethod, RuleSet, RuleSource, RuleStore};
pub use state::{CategoryState, CheckpointRecord};
