//! Profile-Harvest: a profile-scoped content scraper
//!
//! This crate discovers content items on a creator's profile page by
//! scrolling a rendered document, then visits every discovered item to
//! collect its engagement metrics, and hands the merged records to a sink.

pub mod config;
pub mod harvest;
pub mod item;
pub mod output;
pub mod page;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Profile-Harvest operations
///
/// Stage-level failures (a page that would not load, a session that went
/// away) never show up here; the stages fold those into their reports.
/// This type covers setup and persistence.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
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

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid profile handle: {0:?}")]
    InvalidHandle(String),
}

/// Result type alias for Profile-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, RunConfig};
pub use harvest::{harvest, Coordinator, HarvestOutcome, PipelineMode};
pub use item::{DiscoveredItem, EnrichedRecord, FineMetric, NOT_AVAILABLE};
