use crate::harvest::PipelineMode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Profile-Harvest
///
/// Every section and key has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub pipeline: PipelineConfig,
    pub discovery: DiscoveryConfig,
    pub enrichment: EnrichmentConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Which profile to harvest and how many items to collect
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Profile handle, without the leading `@`
    pub handle: String,

    /// Number of distinct items to discover
    pub count: u32,
}

/// Stage wiring
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
}

/// Link discovery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scroll commands issued before giving up on the target count
    #[serde(rename = "max-scroll-attempts")]
    pub max_scroll_attempts: u32,

    /// Pause after each scroll so lazy rendering can catch up (milliseconds)
    #[serde(rename = "scroll-delay")]
    pub scroll_delay: u64,

    /// Bound on loading the profile and on each wait for item containers (milliseconds)
    #[serde(rename = "load-timeout")]
    pub load_timeout: u64,

    /// Selector for one item container on the listing
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// Selector, scoped to a container, for the item link
    #[serde(rename = "link-selector")]
    pub link_selector: String,

    /// Selector, scoped to a container, for the view count
    #[serde(rename = "views-selector")]
    pub views_selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: 140,
            scroll_delay: 1200,
            load_timeout: 30_000,
            item_selector: "div[data-e2e='user-post-item']".to_string(),
            link_selector: "a[href*='/video/']".to_string(),
            views_selector: "strong[data-e2e='video-views']".to_string(),
        }
    }
}

/// Metadata enrichment settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Bound on loading one item page (milliseconds)
    #[serde(rename = "navigation-timeout")]
    pub navigation_timeout: u64,

    /// Pause after load before reading fields (milliseconds)
    #[serde(rename = "settle-delay")]
    pub settle_delay: u64,

    pub selectors: FieldSelectors,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: 30_000,
            settle_delay: 1500,
            selectors: FieldSelectors::default(),
        }
    }
}

/// Page-level selectors for each fine metric
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub likes: String,
    pub comments: String,
    pub shares: String,
    pub caption: String,
    #[serde(rename = "upload-time")]
    pub upload_time: String,
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            likes: "strong[data-e2e='like-count']".to_string(),
            comments: "strong[data-e2e='comment-count']".to_string(),
            shares: "strong[data-e2e='share-count']".to_string(),
            caption: "[data-e2e='browse-video-desc']".to_string(),
            upload_time: "span[data-e2e='browser-nickname'] span:last-child".to_string(),
        }
    }
}

/// Browser session settings, applied to both stages' sessions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Site root that profile addresses are built from
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Explicit Chrome/Chromium binary; autodetected when absent
    pub executable: Option<PathBuf>,

    #[serde(rename = "window-width")]
    pub window_width: Option<u32>,

    #[serde(rename = "window-height")]
    pub window_height: Option<u32>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            base_url: "https://www.tiktok.com".to_string(),
            executable: None,
            window_width: None,
            window_height: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the CSV export is written to; the desktop when absent
    #[serde(rename = "csv-dir")]
    pub csv_dir: Option<PathBuf>,

    /// Optional SQLite database that keeps every run
    #[serde(rename = "database-path")]
    pub database_path: Option<PathBuf>,
}

/// The immutable per-run parameters discovery works from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub target_handle: String,
    pub target_count: usize,
    pub max_scroll_attempts: u32,
    pub scroll_delay: Duration,
}

impl Config {
    /// Derives the run parameters from the loaded configuration
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            target_handle: self.target.handle.clone(),
            target_count: self.target.count as usize,
            max_scroll_attempts: self.discovery.max_scroll_attempts,
            scroll_delay: Duration::from_millis(self.discovery.scroll_delay),
        }
    }
}

impl DiscoveryConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout)
    }
}

impl EnrichmentConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }
}
