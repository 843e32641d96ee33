//! Configuration module for Profile-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use profile_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Will scroll at most {} times", config.discovery.max_scroll_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, DiscoveryConfig, EnrichmentConfig, FieldSelectors, OutputConfig,
    PipelineConfig, RunConfig, TargetConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config,
};
pub use validation::{validate, validate_settings, validate_target};
