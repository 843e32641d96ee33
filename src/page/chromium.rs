//! Chromium-backed page client
//!
//! This module launches one browser session per stage over the Chrome
//! DevTools Protocol:
//! - Building the launch configuration from `[browser]` settings
//! - Driving the CDP event handler on its own task
//! - Turning the end of that handler into the disconnect signal
//! - Mapping CDP failures onto [`PageError`]

use crate::config::BrowserConfig;
use crate::page::{PageClient, PageError, PageResult};
use crate::HarvestError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often `wait_for_selector` re-queries the document
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

const SCROLL_SCRIPT: &str = "window.scrollBy(0, window.innerHeight)";

/// Launch settings for one browser session
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub window: Option<(u32, u32)>,
}

impl From<&BrowserConfig> for SessionSettings {
    fn from(config: &BrowserConfig) -> Self {
        let window = match (config.window_width, config.window_height) {
            (Some(width), Some(height)) => Some((width, height)),
            _ => None,
        };

        Self {
            headless: config.headless,
            executable: config.executable.clone(),
            window,
        }
    }
}

/// Profile directory for one session
///
/// Chrome refuses a second process on a profile that is already in use, so
/// every stage of every run gets its own directory.
pub fn session_data_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("profile-harvest-{}-{}", label, std::process::id()))
}

/// Builds the launch configuration for one session
fn launch_config(settings: &SessionSettings, data_dir: &Path) -> Result<LaunchConfig, String> {
    let mut builder = LaunchConfig::builder().user_data_dir(data_dir);
    if !settings.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &settings.executable {
        builder = builder.chrome_executable(path);
    }
    if let Some((width, height)) = settings.window {
        builder = builder.window_size(width, height);
    }
    builder.build()
}

/// A single browser with a single tab
pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    disconnected: CancellationToken,
    label: String,
    data_dir: PathBuf,
}

impl ChromiumPage {
    /// Launches a browser and opens a blank tab
    ///
    /// # Arguments
    ///
    /// * `settings` - Launch settings
    /// * `label` - Name used in log lines for this session (e.g. "discovery")
    ///
    /// # Returns
    ///
    /// * `Ok(ChromiumPage)` - Browser running with one blank tab
    /// * `Err(HarvestError::Browser)` - The browser could not be started
    pub async fn launch(settings: &SessionSettings, label: &str) -> Result<Self, HarvestError> {
        let data_dir = session_data_dir(label);
        let config = launch_config(settings, &data_dir).map_err(HarvestError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch browser: {}", e)))?;

        let disconnected = CancellationToken::new();
        let token = disconnected.clone();
        let session = label.to_string();
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    if matches!(e, CdpError::Ws(_)) {
                        tracing::debug!("[{}] CDP connection error: {}", session, e);
                        break;
                    }
                    tracing::trace!("[{}] CDP handler error: {}", session, e);
                }
            }
            tracing::debug!("[{}] CDP handler finished", session);
            token.cancel();
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(HarvestError::Browser(format!("failed to open tab: {}", e)));
            }
        };

        tracing::debug!(
            "[{}] Browser session started with profile {}",
            label,
            data_dir.display()
        );

        Ok(Self {
            browser,
            page,
            handler,
            disconnected,
            label: label.to_string(),
            data_dir,
        })
    }

    /// Closes the browser and stops the handler task
    pub async fn close(mut self) {
        if !self.disconnected.is_cancelled() {
            if let Err(e) = self.browser.close().await {
                tracing::warn!("[{}] Failed to close browser: {}", self.label, e);
            }
            if let Err(e) = self.browser.wait().await {
                tracing::debug!("[{}] Failed to wait for browser exit: {}", self.label, e);
            }
        }
        self.handler.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.data_dir) {
            tracing::debug!(
                "[{}] Could not remove profile {}: {}",
                self.label,
                self.data_dir.display(),
                e
            );
        }
        tracing::debug!("[{}] Browser session ended", self.label);
    }

    fn classify(&self, error: CdpError) -> PageError {
        if self.disconnected.is_cancelled() {
            PageError::Disconnected
        } else {
            PageError::Interaction(error.to_string())
        }
    }

    fn ensure_connected(&self) -> PageResult<()> {
        if self.disconnected.is_cancelled() {
            return Err(PageError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl PageClient for ChromiumPage {
    type Element = Element;

    async fn open(&self, address: &str) -> PageResult<()> {
        self.ensure_connected()?;

        self.page
            .goto(address)
            .await
            .map(|_| ())
            .map_err(|e| match self.classify(e) {
                PageError::Interaction(message) => PageError::Navigation {
                    address: address.to_string(),
                    message,
                },
                other => other,
            })
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<()> {
        self.ensure_connected()?;

        let poll = async {
            loop {
                let found = self
                    .page
                    .find_elements(selector)
                    .await
                    .map_err(|e| self.classify(e))?;
                if !found.is_empty() {
                    return Ok::<(), PageError>(());
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(PageError::Timeout {
                what: format!("selector {}", selector),
                after: timeout,
            }),
        }
    }

    async fn query_all(&self, selector: &str) -> PageResult<Vec<Element>> {
        self.ensure_connected()?;
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn query_one(&self, selector: &str) -> PageResult<Option<Element>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_within(&self, element: &Element, selector: &str) -> PageResult<Option<Element>> {
        self.ensure_connected()?;
        let found = element
            .find_elements(selector)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(found.into_iter().next())
    }

    async fn attribute(&self, element: &Element, name: &str) -> PageResult<Option<String>> {
        element.attribute(name).await.map_err(|e| self.classify(e))
    }

    async fn inner_text(&self, element: &Element) -> PageResult<String> {
        let text = element.inner_text().await.map_err(|e| self.classify(e))?;
        Ok(text.unwrap_or_default())
    }

    async fn scroll_viewport(&self) -> PageResult<()> {
        self.ensure_connected()?;
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .map(|_| ())
            .map_err(|e| self.classify(e))
    }

    fn disconnected(&self) -> &CancellationToken {
        &self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_settings_from_config() {
        let config = BrowserConfig {
            headless: true,
            window_width: Some(1280),
            window_height: Some(800),
            ..BrowserConfig::default()
        };

        let settings = SessionSettings::from(&config);
        assert!(settings.headless);
        assert_eq!(settings.window, Some((1280, 800)));
        assert!(settings.executable.is_none());
    }

    #[test]
    fn test_each_stage_gets_its_own_profile() {
        let discovery = session_data_dir("discovery");
        let enrichment = session_data_dir("enrichment");

        assert_ne!(discovery, enrichment);
        assert!(discovery.starts_with(std::env::temp_dir()));
        assert!(discovery
            .to_string_lossy()
            .ends_with(&format!("discovery-{}", std::process::id())));
    }

    #[test]
    fn test_launch_configs_do_not_share_a_profile() {
        let settings = SessionSettings {
            headless: true,
            executable: Some(PathBuf::from("/usr/bin/chromium")),
            window: None,
        };

        let discovery = launch_config(&settings, &session_data_dir("discovery")).unwrap();
        let enrichment = launch_config(&settings, &session_data_dir("enrichment")).unwrap();

        assert!(discovery.user_data_dir.is_some());
        assert_ne!(discovery.user_data_dir, enrichment.user_data_dir);
    }

    #[test]
    fn test_partial_window_size_ignored() {
        let config = BrowserConfig {
            window_width: Some(1280),
            ..BrowserConfig::default()
        };

        assert_eq!(SessionSettings::from(&config).window, None);
    }
}
