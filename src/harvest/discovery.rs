//! Link discovery stage
//!
//! Scrolls a profile listing and emits every item it has not seen before,
//! until one of these happens:
//! - The target count is reached (checked after every emission)
//! - The scroll budget runs out
//! - The session disconnects
//! - A page interaction fails
//!
//! None of these are errors to the caller. The stage always hands back a
//! [`DiscoveryReport`] describing how far it got.

use crate::config::{DiscoveryConfig, RunConfig};
use crate::harvest::queue::ItemSink;
use crate::item::{DiscoveredItem, SeenSet};
use crate::page::{PageClient, PageError};
use crate::url::resolve_item_url;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Why discovery stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Emitted exactly the target count
    TargetReached,
    /// Used every scroll without reaching the target
    ScrollBudgetExhausted,
    /// The browsing session went away
    SessionDisconnected,
    /// The profile never loaded
    NavigationFailed(String),
    /// A scroll, wait or query failed mid-run
    InteractionFailed(String),
    /// The consumer stopped accepting items
    ConsumerClosed,
}

impl StopReason {
    /// True only when the target count was met
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::TargetReached)
    }

    /// Short machine-friendly name, used for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::ScrollBudgetExhausted => "scroll_budget_exhausted",
            Self::SessionDisconnected => "session_disconnected",
            Self::NavigationFailed(_) => "navigation_failed",
            Self::InteractionFailed(_) => "interaction_failed",
            Self::ConsumerClosed => "consumer_closed",
        }
    }

    /// The message carried by failure reasons, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NavigationFailed(message) | Self::InteractionFailed(message) => Some(message),
            _ => None,
        }
    }

    fn from_page_error(error: PageError) -> Self {
        match error {
            PageError::Disconnected => Self::SessionDisconnected,
            other => Self::InteractionFailed(other.to_string()),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetReached => write!(f, "target reached"),
            Self::ScrollBudgetExhausted => write!(f, "scroll budget exhausted"),
            Self::SessionDisconnected => write!(f, "session disconnected"),
            Self::NavigationFailed(message) => write!(f, "navigation failed: {}", message),
            Self::InteractionFailed(message) => write!(f, "interaction failed: {}", message),
            Self::ConsumerClosed => write!(f, "consumer closed"),
        }
    }
}

/// What discovery achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Distinct items emitted
    pub emitted: usize,
    /// Scroll commands issued
    pub scrolls: u32,
    pub stop: StopReason,
}

/// Selectors discovery reads the listing with
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub item: String,
    pub link: String,
    pub views: String,
}

impl From<&DiscoveryConfig> for ListingSelectors {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            item: config.item_selector.clone(),
            link: config.link_selector.clone(),
            views: config.views_selector.clone(),
        }
    }
}

/// The discovery stage, bound to its own page
pub struct Discoverer<P: PageClient> {
    page: P,
    run: RunConfig,
    profile: Url,
    selectors: ListingSelectors,
    load_timeout: Duration,
}

impl<P: PageClient> Discoverer<P> {
    /// Creates a discovery stage
    ///
    /// # Arguments
    ///
    /// * `page` - The page client this stage owns
    /// * `run` - Target count, scroll budget and scroll delay
    /// * `profile` - Absolute profile address
    /// * `config` - Selectors and load timeout
    pub fn new(page: P, run: RunConfig, profile: Url, config: &DiscoveryConfig) -> Self {
        Self {
            page,
            run,
            profile,
            selectors: ListingSelectors::from(config),
            load_timeout: config.load_timeout(),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Runs discovery, emitting each new item into `sink` as soon as it is found
    pub async fn run<S: ItemSink>(&self, sink: &mut S) -> DiscoveryReport {
        let mut seen = SeenSet::new();
        let mut scrolls = 0;

        let stop = self.drive(sink, &mut seen, &mut scrolls).await;

        tracing::info!(
            "Discovery finished ({}). Collected {} links in {} scrolls.",
            stop,
            seen.len(),
            scrolls
        );

        DiscoveryReport {
            emitted: seen.len(),
            scrolls,
            stop,
        }
    }

    async fn drive<S: ItemSink>(
        &self,
        sink: &mut S,
        seen: &mut SeenSet,
        scrolls: &mut u32,
    ) -> StopReason {
        if self.run.target_count == 0 {
            tracing::info!("Target count is 0, nothing to discover");
            return StopReason::TargetReached;
        }

        if let Some(stop) = self.load_profile().await {
            return stop;
        }
        tracing::info!("Page loaded. Starting scroll...");

        loop {
            if self.page.is_disconnected() {
                tracing::warn!("Browser was closed by the user");
                return StopReason::SessionDisconnected;
            }

            match self.collect_visible(sink, seen).await {
                Ok(Some(stop)) => return stop,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Error during scroll {}: {}", scrolls, e);
                    return StopReason::from_page_error(e);
                }
            }

            if *scrolls >= self.run.max_scroll_attempts {
                tracing::info!(
                    "Stopping after {} scrolls with {}/{} items",
                    scrolls,
                    seen.len(),
                    self.run.target_count
                );
                return StopReason::ScrollBudgetExhausted;
            }

            if let Err(e) = self.page.scroll_viewport().await {
                tracing::error!("Error during scroll {}: {}", scrolls, e);
                return StopReason::from_page_error(e);
            }
            tokio::time::sleep(self.run.scroll_delay).await;
            *scrolls += 1;
            tracing::info!("Scroll count: {}/{}", scrolls, self.run.max_scroll_attempts);
        }
    }

    /// Opens the profile and waits for the first containers
    async fn load_profile(&self) -> Option<StopReason> {
        let address = self.profile.as_str();

        let opened = match tokio::time::timeout(self.load_timeout, self.page.open(address)).await {
            Ok(result) => result,
            Err(_) => Err(PageError::Timeout {
                what: format!("navigation to {}", address),
                after: self.load_timeout,
            }),
        };

        let ready = match opened {
            Ok(()) => {
                self.page
                    .wait_for_selector(&self.selectors.item, self.load_timeout)
                    .await
            }
            Err(e) => Err(e),
        };

        match ready {
            Ok(()) => None,
            Err(PageError::Disconnected) => {
                tracing::warn!("Browser was closed before {} loaded", address);
                Some(StopReason::SessionDisconnected)
            }
            Err(e) => {
                tracing::error!("Failed to load profile {}: {}", address, e);
                Some(StopReason::NavigationFailed(e.to_string()))
            }
        }
    }

    /// Enumerates the containers currently rendered and emits unseen items
    ///
    /// Returns `Some` when the run should end here.
    async fn collect_visible<S: ItemSink>(
        &self,
        sink: &mut S,
        seen: &mut SeenSet,
    ) -> Result<Option<StopReason>, PageError> {
        self.page
            .wait_for_selector(&self.selectors.item, self.load_timeout)
            .await?;
        let containers = self.page.query_all(&self.selectors.item).await?;

        for container in &containers {
            let Some(item) = self.extract(container).await else {
                continue;
            };

            if !seen.insert(&item.id) {
                continue;
            }

            tracing::info!("[P] {}: {} - {}", seen.len(), item.id, item.coarse_metric);
            if !sink.accept(item) {
                tracing::warn!("Consumer stopped accepting items");
                return Ok(Some(StopReason::ConsumerClosed));
            }

            if seen.len() >= self.run.target_count {
                return Ok(Some(StopReason::TargetReached));
            }
        }

        Ok(None)
    }

    /// Reads one container; `None` when it has no usable link
    async fn extract(&self, container: &P::Element) -> Option<DiscoveredItem> {
        let link = match self.page.query_within(container, &self.selectors.link).await {
            Ok(Some(link)) => link,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Skipping container, link lookup failed: {}", e);
                return None;
            }
        };

        let href = match self.page.attribute(&link, "href").await {
            Ok(Some(href)) => href,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Skipping container, href read failed: {}", e);
                return None;
            }
        };

        let Some(id) = resolve_item_url(&self.profile, &href) else {
            tracing::debug!("Skipping container with unusable href {:?}", href);
            return None;
        };

        let views = match self.page.query_within(container, &self.selectors.views).await {
            Ok(Some(element)) => self.page.inner_text(&element).await.ok(),
            _ => None,
        };

        Some(DiscoveredItem::new(id, views))
    }
}
