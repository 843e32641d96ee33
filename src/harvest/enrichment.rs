//! Metadata enrichment stage
//!
//! Visits each discovered item, in the order received, and reads its fine
//! metrics. A field that cannot be read becomes the sentinel; a page that
//! cannot be loaded drops that one item and the stage moves on.

use crate::config::{EnrichmentConfig, FieldSelectors};
use crate::harvest::queue::ItemSource;
use crate::item::{or_sentinel, DiscoveredItem, EnrichedRecord, FineMetric, SeenSet, NOT_AVAILABLE};
use crate::page::{PageClient, PageError, PageResult};
use std::time::Duration;

/// An item that could not be enriched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    /// 1-based position in the order items were received
    pub position: usize,
    pub id: String,
    pub reason: String,
}

/// What enrichment produced
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// One record per successfully loaded item, in processing order
    pub records: Vec<EnrichedRecord>,
    pub failures: Vec<EnrichmentFailure>,
    /// Items received more than once and processed only the first time
    pub duplicates: usize,
}

impl EnrichmentReport {
    /// Number of items received, duplicates included
    pub fn received(&self) -> usize {
        self.records.len() + self.failures.len() + self.duplicates
    }
}

/// Builds the fixed (metric, selector) list in column order
fn field_plan(selectors: &FieldSelectors) -> Vec<(FineMetric, String)> {
    FineMetric::ALL
        .iter()
        .map(|metric| {
            let selector = match metric {
                FineMetric::Likes => &selectors.likes,
                FineMetric::Comments => &selectors.comments,
                FineMetric::Shares => &selectors.shares,
                FineMetric::Caption => &selectors.caption,
                FineMetric::UploadTime => &selectors.upload_time,
            };
            (*metric, selector.clone())
        })
        .collect()
}

/// The enrichment stage, bound to its own page
pub struct Enricher<P: PageClient> {
    page: P,
    fields: Vec<(FineMetric, String)>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl<P: PageClient> Enricher<P> {
    pub fn new(page: P, config: &EnrichmentConfig) -> Self {
        Self {
            page,
            fields: field_plan(&config.selectors),
            navigation_timeout: config.navigation_timeout(),
            settle_delay: config.settle_delay(),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Enriches every item `source` yields until it is exhausted
    ///
    /// One attempt per item. Failures are logged with their position and
    /// never end the stage early.
    pub async fn run<S: ItemSource>(&self, mut source: S) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        let mut seen = SeenSet::new();
        let mut position = 0;

        tracing::info!("Scraping videos...");

        while let Some(item) = source.next_item().await {
            position += 1;

            if !seen.insert(&item.id) {
                tracing::debug!("Skipping duplicate {} at position {}", item.id, position);
                report.duplicates += 1;
                continue;
            }

            let id = item.id.clone();
            match self.enrich_one(item).await {
                Ok(record) => {
                    tracing::info!(
                        "[C] {}: {} -> views({}), likes({}), comments({}), shares({})",
                        position,
                        record.id,
                        record.coarse_metric,
                        record.get(FineMetric::Likes),
                        record.get(FineMetric::Comments),
                        record.get(FineMetric::Shares)
                    );
                    report.records.push(record);
                }
                Err(e) => {
                    tracing::warn!("At position {} failed to scrape {}: {}", position, id, e);
                    report.failures.push(EnrichmentFailure {
                        position,
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Enrichment finished. {} records, {} failures.",
            report.records.len(),
            report.failures.len()
        );

        report
    }

    /// Loads one item page and reads every fine metric
    ///
    /// # Returns
    ///
    /// * `Ok(EnrichedRecord)` - The page loaded; unreadable fields hold the sentinel
    /// * `Err(PageError)` - The page did not load within the navigation timeout
    pub async fn enrich_one(&self, item: DiscoveredItem) -> PageResult<EnrichedRecord> {
        match tokio::time::timeout(self.navigation_timeout, self.page.open(&item.id)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PageError::Timeout {
                    what: format!("navigation to {}", item.id),
                    after: self.navigation_timeout,
                })
            }
        }

        // Fields can paint after the load event
        tokio::time::sleep(self.settle_delay).await;

        let mut record = EnrichedRecord::from_item(item);
        for (metric, selector) in &self.fields {
            let value = self.read_field(selector).await;
            record.set(*metric, value);
        }

        Ok(record)
    }

    /// Reads one field's text, falling back to the sentinel on any failure
    async fn read_field(&self, selector: &str) -> String {
        let lookup = self.field_text(selector);

        match tokio::time::timeout(self.navigation_timeout, lookup).await {
            Ok(Ok(text)) => or_sentinel(text),
            Ok(Err(e)) => {
                tracing::debug!("Field {} unreadable: {}", selector, e);
                NOT_AVAILABLE.to_string()
            }
            Err(_) => {
                tracing::debug!("Field {} timed out", selector);
                NOT_AVAILABLE.to_string()
            }
        }
    }

    async fn field_text(&self, selector: &str) -> PageResult<Option<String>> {
        match self.page.query_one(selector).await? {
            Some(element) => Ok(Some(self.page.inner_text(&element).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{SnapshotPage, SnapshotSite};

    fn item_page(likes: Option<&str>, comments: &str, shares: &str) -> String {
        let likes = likes
            .map(|l| format!(r#"<strong data-e2e="like-count">{}</strong>"#, l))
            .unwrap_or_default();
        format!(
            r#"<html><body>
                {}
                <strong data-e2e="comment-count">{}</strong>
                <strong data-e2e="share-count">{}</strong>
                <h1 data-e2e="browse-video-desc">caption #tag</h1>
                <span data-e2e="browser-nickname"><span>someone</span><span>·</span><span>2024-3-1</span></span>
            </body></html>"#,
            likes, comments, shares
        )
    }

    fn url(n: usize) -> String {
        format!("https://example.com/@someone/video/{}", n)
    }

    fn config() -> EnrichmentConfig {
        EnrichmentConfig {
            navigation_timeout: 100,
            settle_delay: 1,
            ..EnrichmentConfig::default()
        }
    }

    fn items(count: usize) -> Vec<DiscoveredItem> {
        (1..=count)
            .map(|n| DiscoveredItem::new(url(n), Some(format!("{}00", n))))
            .collect()
    }

    fn site_with(count: usize) -> SnapshotSite {
        (1..=count).fold(SnapshotSite::new(), |site, n| {
            site.page(&url(n), [item_page(Some("12"), "3", "4")])
        })
    }

    #[tokio::test]
    async fn test_all_fields_read() {
        let enricher = Enricher::new(SnapshotPage::new(site_with(1)), &config());

        let record = enricher.enrich_one(items(1).remove(0)).await.unwrap();

        assert_eq!(record.id, url(1));
        assert_eq!(record.coarse_metric, "100");
        assert_eq!(record.get(FineMetric::Likes), "12");
        assert_eq!(record.get(FineMetric::Comments), "3");
        assert_eq!(record.get(FineMetric::Shares), "4");
        assert_eq!(record.get(FineMetric::Caption), "caption #tag");
        assert_eq!(record.get(FineMetric::UploadTime), "2024-3-1");
    }

    #[tokio::test]
    async fn test_missing_field_becomes_sentinel() {
        let site = SnapshotSite::new().page(&url(1), [item_page(None, "3", "4")]);
        let enricher = Enricher::new(SnapshotPage::new(site), &config());

        let record = enricher.enrich_one(items(1).remove(0)).await.unwrap();

        assert_eq!(record.get(FineMetric::Likes), NOT_AVAILABLE);
        assert_eq!(record.get(FineMetric::Comments), "3");
        assert_eq!(record.get(FineMetric::Shares), "4");
        assert_eq!(record.get(FineMetric::UploadTime), "2024-3-1");
    }

    #[tokio::test]
    async fn test_failed_item_is_contained() {
        let site = site_with(5).failing(&url(3));
        let enricher = Enricher::new(SnapshotPage::new(site), &config());

        let report = enricher.run(items(5).into_iter()).await;

        let ids: Vec<String> = report.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![url(1), url(2), url(4), url(5)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].position, 3);
        assert_eq!(report.failures[0].id, url(3));
        assert_eq!(enricher.page().opened().len(), 5);
    }

    #[tokio::test]
    async fn test_hanging_item_times_out_and_run_continues() {
        let site = site_with(3).hanging(&url(2));
        let enricher = Enricher::new(SnapshotPage::new(site), &config());

        let report = enricher.run(items(3).into_iter()).await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failures[0].position, 2);
        assert!(report.failures[0].reason.contains("Timed out"));
    }

    #[tokio::test]
    async fn test_duplicates_processed_once() {
        let enricher = Enricher::new(SnapshotPage::new(site_with(2)), &config());
        let mut input = items(2);
        input.insert(1, input[0].clone());

        let report = enricher.run(input.into_iter()).await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.received(), 3);
        assert_eq!(enricher.page().opened(), vec![url(1), url(2)]);
    }

    #[tokio::test]
    async fn test_processes_in_received_order() {
        let enricher = Enricher::new(SnapshotPage::new(site_with(4)), &config());
        let mut input = items(4);
        input.reverse();

        let report = enricher.run(input.into_iter()).await;

        assert_eq!(enricher.page().opened(), vec![url(4), url(3), url(2), url(1)]);
        assert_eq!(report.records[0].id, url(4));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let enricher = Enricher::new(SnapshotPage::new(site_with(1)), &config());
        let report = enricher.run(Vec::<DiscoveredItem>::new().into_iter()).await;

        assert!(report.records.is_empty());
        assert!(report.failures.is_empty());
        assert!(enricher.page().calls().is_empty());
    }

    #[test]
    fn test_field_plan_covers_every_metric() {
        let plan = field_plan(&FieldSelectors::default());
        let metrics: Vec<FineMetric> = plan.iter().map(|(m, _)| *m).collect();
        assert_eq!(metrics, FineMetric::ALL.to_vec());
    }
}
