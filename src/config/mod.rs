//! Configuration module for Attribute-Miner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use attribute_miner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("miner.toml")).unwrap();
//! println!("Sampling {} pages per category", config.learner.sample_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, LearnerConfig, OrchestratorConfig, OutputConfig, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
