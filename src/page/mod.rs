//! Rendered-page client
//!
//! The stages never touch a browser directly. They drive a [`PageClient`],
//! which exposes the handful of interactions a lazily rendered document
//! needs:
//! - Navigation with failure reporting
//! - Waiting for an element to materialize
//! - Page-level and element-scoped queries
//! - Attribute and text reads
//! - Scrolling one viewport forward
//! - A disconnect flag the caller polls
//!
//! [`ChromiumPage`] drives a real browser; [`SnapshotPage`] replays
//! scripted HTML frames.

mod chromium;
mod snapshot;

pub use chromium::{ChromiumPage, SessionSettings};
pub use snapshot::{CallLog, PageCall, SnapshotElement, SnapshotPage, SnapshotSite};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors raised by page interactions
#[derive(Debug, Clone, Error)]
pub enum PageError {
    #[error("Navigation to {address} failed: {message}")]
    Navigation { address: String, message: String },

    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("Browser session disconnected")]
    Disconnected,

    #[error("Page interaction failed: {0}")]
    Interaction(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// Result type for page interactions
pub type PageResult<T> = Result<T, PageError>;

/// One rendered document, driven one interaction at a time
///
/// Each stage owns its own client, so implementations never see two callers
/// on the same document.
#[async_trait]
pub trait PageClient: Send + Sync {
    /// Handle to an element of the current document
    type Element: Send + Sync;

    /// Navigates to `address` and waits for the load to complete
    async fn open(&self, address: &str) -> PageResult<()>;

    /// Waits until at least one element matches `selector`
    ///
    /// Fails with [`PageError::Timeout`] once `timeout` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<()>;

    /// All elements matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> PageResult<Vec<Self::Element>>;

    /// First element matching `selector`, if any
    async fn query_one(&self, selector: &str) -> PageResult<Option<Self::Element>>;

    /// First descendant of `element` matching `selector`, if any
    async fn query_within(
        &self,
        element: &Self::Element,
        selector: &str,
    ) -> PageResult<Option<Self::Element>>;

    /// Value of attribute `name` on `element`
    async fn attribute(&self, element: &Self::Element, name: &str) -> PageResult<Option<String>>;

    /// Rendered text of `element`
    async fn inner_text(&self, element: &Self::Element) -> PageResult<String>;

    /// Scrolls forward by one viewport height
    async fn scroll_viewport(&self) -> PageResult<()>;

    /// Token cancelled once the underlying session goes away
    fn disconnected(&self) -> &CancellationToken;

    /// Convenience check on [`PageClient::disconnected`]
    fn is_disconnected(&self) -> bool {
        self.disconnected().is_cancelled()
    }
}
