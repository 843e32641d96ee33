//! Scripted page client
//!
//! Serves fixed HTML frames instead of a live browser. Every address maps to
//! a list of frames: opening the address shows the first frame and each
//! scroll reveals the next one (the last frame stays put), which is how a
//! lazily rendered listing looks from the outside. Navigation failures,
//! hangs, scroll errors and disconnects can be injected, and every
//! interaction is logged for ordering checks.

use crate::page::{PageClient, PageError, PageResult};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted content and faults for a [`SnapshotPage`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotSite {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    disconnect_after_scrolls: Option<u32>,
    scroll_error_after: Option<u32>,
}

impl SnapshotSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `frames` at `address`; frame `n` is what is rendered after `n` scrolls
    pub fn page<I, S>(mut self, address: &str, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages
            .insert(address.to_string(), frames.into_iter().map(Into::into).collect());
        self
    }

    /// Navigation to `address` fails with a network error
    pub fn failing(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    /// Navigation to `address` never completes
    pub fn hanging(mut self, address: &str) -> Self {
        self.hanging.insert(address.to_string());
        self
    }

    /// The session reports disconnection once `scrolls` scrolls have happened
    pub fn disconnect_after_scrolls(mut self, scrolls: u32) -> Self {
        self.disconnect_after_scrolls = Some(scrolls);
        self
    }

    /// Scroll number `scrolls` (1-based) fails with an interaction error
    pub fn scroll_error_after(mut self, scrolls: u32) -> Self {
        self.scroll_error_after = Some(scrolls);
        self
    }
}

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    Open(String),
    WaitFor(String),
    Scroll,
}

/// Interaction log shared by several pages
///
/// Pages created with [`SnapshotPage::with_log`] append to it as well as to
/// their own log, which gives one ordering across both stages of a run.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<PageCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every interaction on any attached page, oldest first
    pub fn calls(&self) -> Vec<PageCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, call: PageCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

/// Handle to an element of a snapshot frame
///
/// Attributes and text are captured when the element is queried, so reading
/// them never re-parses the document.
#[derive(Debug, Clone)]
pub struct SnapshotElement {
    html: String,
    attributes: HashMap<String, String>,
    text: String,
}

#[derive(Debug, Default)]
struct SnapshotState {
    current: Option<String>,
    frame: usize,
    scrolls: u32,
    calls: Vec<PageCall>,
}

enum OpenPlan {
    Hang,
    Fail,
    Missing,
    Load,
}

/// A page client backed by a [`SnapshotSite`]
pub struct SnapshotPage {
    site: SnapshotSite,
    state: Mutex<SnapshotState>,
    disconnected: CancellationToken,
    shared: Option<CallLog>,
}

impl SnapshotPage {
    pub fn new(site: SnapshotSite) -> Self {
        Self {
            site,
            state: Mutex::new(SnapshotState::default()),
            disconnected: CancellationToken::new(),
            shared: None,
        }
    }

    /// Like [`SnapshotPage::new`], also recording every interaction in `log`
    pub fn with_log(site: SnapshotSite, log: CallLog) -> Self {
        Self {
            shared: Some(log),
            ..Self::new(site)
        }
    }

    /// Every interaction so far, oldest first
    pub fn calls(&self) -> Vec<PageCall> {
        self.lock().calls.clone()
    }

    /// Addresses passed to `open`, oldest first
    pub fn opened(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                PageCall::Open(address) => Some(address.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of scrolls performed
    pub fn scroll_count(&self) -> u32 {
        self.lock().scrolls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SnapshotState> {
        // A poisoned lock only means a test panicked mid-call; the log is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, state: &mut SnapshotState, call: PageCall) {
        if let Some(log) = &self.shared {
            log.push(call.clone());
        }
        state.calls.push(call);
    }

    fn ensure_connected(&self) -> PageResult<()> {
        if self.disconnected.is_cancelled() {
            return Err(PageError::Disconnected);
        }
        Ok(())
    }

    /// HTML of the frame currently on screen
    fn current_frame(&self) -> PageResult<String> {
        let state = self.lock();
        let address = state
            .current
            .as_ref()
            .ok_or_else(|| PageError::Interaction("no document loaded".to_string()))?;
        let frames = self
            .site
            .pages
            .get(address)
            .ok_or_else(|| PageError::Interaction(format!("no frames for {}", address)))?;

        Ok(frames
            .get(state.frame.min(frames.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default())
    }
}

fn parse_selector(selector: &str) -> PageResult<Selector> {
    Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))
}

fn capture(element: ElementRef<'_>) -> SnapshotElement {
    SnapshotElement {
        html: element.html(),
        attributes: element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        text: element.text().collect(),
    }
}

fn select_document(html: &str, selector: &str) -> PageResult<Vec<SnapshotElement>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(capture).collect())
}

/// First descendant of the fragment's top element matching `selector`
fn select_within(fragment_html: &str, selector: &str) -> PageResult<Option<SnapshotElement>> {
    let selector = parse_selector(selector)?;
    let fragment = Html::parse_fragment(fragment_html);
    let top = fragment
        .root_element()
        .children()
        .find_map(ElementRef::wrap)
        .map(|element| element.id());

    Ok(fragment
        .select(&selector)
        .find(|element| Some(element.id()) != top)
        .map(capture))
}

#[async_trait]
impl PageClient for SnapshotPage {
    type Element = SnapshotElement;

    async fn open(&self, address: &str) -> PageResult<()> {
        self.ensure_connected()?;

        let plan = {
            let mut state = self.lock();
            self.record(&mut state, PageCall::Open(address.to_string()));

            if self.site.hanging.contains(address) {
                OpenPlan::Hang
            } else if self.site.failing.contains(address) {
                OpenPlan::Fail
            } else if !self.site.pages.contains_key(address) {
                OpenPlan::Missing
            } else {
                state.current = Some(address.to_string());
                state.frame = 0;
                OpenPlan::Load
            }
        };

        match plan {
            OpenPlan::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            OpenPlan::Fail => Err(PageError::Navigation {
                address: address.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            }),
            OpenPlan::Missing => Err(PageError::Navigation {
                address: address.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
            OpenPlan::Load => Ok(()),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> PageResult<()> {
        self.ensure_connected()?;
        {
            let mut state = self.lock();
            self.record(&mut state, PageCall::WaitFor(selector.to_string()));
        }

        let frame = self.current_frame()?;
        if !select_document(&frame, selector)?.is_empty() {
            return Ok(());
        }

        // Snapshot frames only change on scroll, so the wait can only run out
        tokio::time::sleep(timeout).await;
        Err(PageError::Timeout {
            what: format!("selector {}", selector),
            after: timeout,
        })
    }

    async fn query_all(&self, selector: &str) -> PageResult<Vec<SnapshotElement>> {
        self.ensure_connected()?;
        let frame = self.current_frame()?;
        select_document(&frame, selector)
    }

    async fn query_one(&self, selector: &str) -> PageResult<Option<SnapshotElement>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_within(
        &self,
        element: &SnapshotElement,
        selector: &str,
    ) -> PageResult<Option<SnapshotElement>> {
        self.ensure_connected()?;
        select_within(&element.html, selector)
    }

    async fn attribute(
        &self,
        element: &SnapshotElement,
        name: &str,
    ) -> PageResult<Option<String>> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn inner_text(&self, element: &SnapshotElement) -> PageResult<String> {
        Ok(element.text.clone())
    }

    async fn scroll_viewport(&self) -> PageResult<()> {
        self.ensure_connected()?;

        let mut state = self.lock();
        self.record(&mut state, PageCall::Scroll);
        state.scrolls += 1;

        if self.site.scroll_error_after == Some(state.scrolls) {
            return Err(PageError::Interaction(
                "Execution context was destroyed".to_string(),
            ));
        }

        state.frame += 1;

        if self.site.disconnect_after_scrolls == Some(state.scrolls) {
            self.disconnected.cancel();
        }

        Ok(())
    }

    fn disconnected(&self) -> &CancellationToken {
        &self.disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "https://example.com/@someone";

    fn listing_site() -> SnapshotSite {
        SnapshotSite::new().page(
            LISTING,
            [
                r#"<div class="item" data-id="1"><a href="/v/1">one</a><b>10</b></div>"#,
                r#"<div class="item" data-id="1"><a href="/v/1">one</a><b>10</b></div>
                   <div class="item" data-id="2"><a href="/v/2">two</a></div>"#,
            ],
        )
    }

    #[tokio::test]
    async fn test_frames_advance_on_scroll() {
        let page = SnapshotPage::new(listing_site());
        page.open(LISTING).await.unwrap();

        assert_eq!(page.query_all("div.item").await.unwrap().len(), 1);
        page.scroll_viewport().await.unwrap();
        assert_eq!(page.query_all("div.item").await.unwrap().len(), 2);

        // Past the last frame the document stays as it is
        page.scroll_viewport().await.unwrap();
        assert_eq!(page.query_all("div.item").await.unwrap().len(), 2);
        assert_eq!(page.scroll_count(), 2);
    }

    #[tokio::test]
    async fn test_scoped_queries_and_reads() {
        let page = SnapshotPage::new(listing_site());
        page.open(LISTING).await.unwrap();

        let items = page.query_all("div.item").await.unwrap();
        let item = &items[0];
        assert_eq!(
            page.attribute(item, "data-id").await.unwrap().as_deref(),
            Some("1")
        );

        let link = page.query_within(item, "a").await.unwrap().unwrap();
        assert_eq!(
            page.attribute(&link, "href").await.unwrap().as_deref(),
            Some("/v/1")
        );

        let views = page.query_within(item, "b").await.unwrap().unwrap();
        assert_eq!(page.inner_text(&views).await.unwrap(), "10");

        assert!(page.query_within(item, "strong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_within_skips_the_container_itself() {
        let page = SnapshotPage::new(listing_site());
        page.open(LISTING).await.unwrap();

        let items = page.query_all("div.item").await.unwrap();
        assert!(page.query_within(&items[0], "div.item").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_faults() {
        let site = listing_site()
            .failing("https://example.com/broken")
            .hanging("https://example.com/slow");
        let page = SnapshotPage::new(site);

        let err = page.open("https://example.com/broken").await.unwrap_err();
        assert!(matches!(err, PageError::Navigation { .. }));

        let err = page.open("https://example.com/unknown").await.unwrap_err();
        assert!(matches!(err, PageError::Navigation { .. }));

        let hung = tokio::time::timeout(
            Duration::from_millis(20),
            page.open("https://example.com/slow"),
        )
        .await;
        assert!(hung.is_err());

        assert_eq!(
            page.opened(),
            vec![
                "https://example.com/broken",
                "https://example.com/unknown",
                "https://example.com/slow"
            ]
        );
    }

    #[tokio::test]
    async fn test_wait_for_missing_selector_times_out() {
        let page = SnapshotPage::new(listing_site());
        page.open(LISTING).await.unwrap();

        assert!(page
            .wait_for_selector("div.item", Duration::from_millis(10))
            .await
            .is_ok());
        let err = page
            .wait_for_selector("section", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_after_scrolls() {
        let page = SnapshotPage::new(listing_site().disconnect_after_scrolls(1));
        page.open(LISTING).await.unwrap();

        assert!(!page.is_disconnected());
        page.scroll_viewport().await.unwrap();
        assert!(page.is_disconnected());
        assert!(matches!(
            page.query_all("div.item").await,
            Err(PageError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let page = SnapshotPage::new(listing_site());
        page.open(LISTING).await.unwrap();
        assert!(matches!(
            page.query_all("div[[").await,
            Err(PageError::InvalidSelector(_))
        ));
    }

    #[tokio::test]
    async fn test_query_before_open_fails() {
        let page = SnapshotPage::new(listing_site());
        assert!(matches!(
            page.query_all("div").await,
            Err(PageError::Interaction(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_log_interleaves_pages() {
        let log = CallLog::new();
        let first = SnapshotPage::with_log(listing_site(), log.clone());
        let second = SnapshotPage::with_log(listing_site(), log.clone());

        first.open(LISTING).await.unwrap();
        second.open(LISTING).await.unwrap();
        first.scroll_viewport().await.unwrap();

        assert_eq!(
            log.calls(),
            vec![
                PageCall::Open(LISTING.to_string()),
                PageCall::Open(LISTING.to_string()),
                PageCall::Scroll,
            ]
        );
        assert_eq!(first.calls().len(), 2);
        assert_eq!(second.calls().len(), 1);
    }
}
