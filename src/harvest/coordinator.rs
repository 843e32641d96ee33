//! Pipeline coordinator
//!
//! Wires discovery to enrichment, either one after the other (batch) or
//! concurrently through the hand-off queue (streaming), and merges the two
//! stage reports into a [`HarvestOutcome`].

use crate::config::Config;
use crate::harvest::discovery::{Discoverer, DiscoveryReport};
use crate::harvest::enrichment::{Enricher, EnrichmentFailure, EnrichmentReport};
use crate::harvest::queue::handoff;
use crate::harvest::PipelineMode;
use crate::item::{DiscoveredItem, EnrichedRecord};
use crate::page::{ChromiumPage, PageClient, SessionSettings};
use crate::url::profile_url;
use crate::HarvestError;
use std::time::{Duration, Instant};

/// Merged result of one run
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub handle: String,
    pub mode: PipelineMode,
    /// Enriched records in processing order
    pub records: Vec<EnrichedRecord>,
    /// Items dropped by enrichment, with reasons
    pub failures: Vec<EnrichmentFailure>,
    pub discovery: DiscoveryReport,
    pub elapsed: Duration,
}

impl HarvestOutcome {
    /// True when discovery stopped short of the target or items were dropped
    pub fn is_partial(&self) -> bool {
        !self.discovery.stop.is_complete() || !self.failures.is_empty()
    }
}

/// Runs both stages and merges their output
pub struct Coordinator<D: PageClient, E: PageClient> {
    handle: String,
    mode: PipelineMode,
    discoverer: Discoverer<D>,
    enricher: Enricher<E>,
}

impl<D: PageClient, E: PageClient> Coordinator<D, E> {
    /// Creates a coordinator around two independently owned stages
    pub fn new(
        handle: impl Into<String>,
        mode: PipelineMode,
        discoverer: Discoverer<D>,
        enricher: Enricher<E>,
    ) -> Self {
        Self {
            handle: handle.into(),
            mode,
            discoverer,
            enricher,
        }
    }

    pub fn discoverer(&self) -> &Discoverer<D> {
        &self.discoverer
    }

    pub fn enricher(&self) -> &Enricher<E> {
        &self.enricher
    }

    /// Gives the stages back, e.g. to close their sessions
    pub fn into_stages(self) -> (Discoverer<D>, Enricher<E>) {
        (self.discoverer, self.enricher)
    }

    /// Runs the pipeline to completion
    ///
    /// Returns only after both stages have terminated. Never fails: a stage
    /// that stops early contributes whatever it collected.
    pub async fn run(&self) -> HarvestOutcome {
        tracing::info!("Starting {} harvest of @{}", self.mode, self.handle);
        let start_time = Instant::now();

        let (discovery, enrichment) = match self.mode {
            PipelineMode::Batch => self.run_batch().await,
            PipelineMode::Streaming => self.run_streaming().await,
        };

        let outcome = HarvestOutcome {
            handle: self.handle.clone(),
            mode: self.mode,
            records: enrichment.records,
            failures: enrichment.failures,
            discovery,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Harvest completed: {} discovered, {} enriched, {} failed in {:?}",
            outcome.discovery.emitted,
            outcome.records.len(),
            outcome.failures.len(),
            outcome.elapsed
        );

        outcome
    }

    /// Discovery to completion, then enrichment over the full list
    async fn run_batch(&self) -> (DiscoveryReport, EnrichmentReport) {
        let mut items: Vec<DiscoveredItem> = Vec::new();
        let discovery = self.discoverer.run(&mut items).await;
        let enrichment = self.enricher.run(items.into_iter()).await;
        (discovery, enrichment)
    }

    /// Both stages at once, joined by the hand-off queue
    ///
    /// The queue is closed when discovery returns, whatever the reason, and
    /// enrichment drains what is left before finishing.
    async fn run_streaming(&self) -> (DiscoveryReport, EnrichmentReport) {
        let (sender, receiver) = handoff();

        let producer = async {
            let mut sender = sender;
            let report = self.discoverer.run(&mut sender).await;
            sender.close();
            report
        };
        let consumer = self.enricher.run(receiver);

        tokio::join!(producer, consumer)
    }
}

/// Runs a complete harvest against live browser sessions
///
/// Launches one browser for each stage, runs the coordinator, and closes
/// both browsers before returning.
///
/// # Returns
///
/// * `Ok(HarvestOutcome)` - The run finished (possibly with partial results)
/// * `Err(HarvestError)` - The profile address was invalid or a browser would not start
pub async fn run_harvest(config: &Config) -> Result<HarvestOutcome, HarvestError> {
    let run = config.run_config();
    let profile = profile_url(&config.browser.base_url, &run.target_handle)?;
    let settings = SessionSettings::from(&config.browser);

    let discovery_page = ChromiumPage::launch(&settings, "discovery").await?;
    let enrichment_page = match ChromiumPage::launch(&settings, "enrichment").await {
        Ok(page) => page,
        Err(e) => {
            discovery_page.close().await;
            return Err(e);
        }
    };

    let handle = run.target_handle.clone();
    let discoverer = Discoverer::new(discovery_page, run, profile, &config.discovery);
    let enricher = Enricher::new(enrichment_page, &config.enrichment);
    let coordinator = Coordinator::new(handle, config.pipeline.mode, discoverer, enricher);

    let outcome = coordinator.run().await;

    let (discoverer, enricher) = coordinator.into_stages();
    discoverer.into_page().close().await;
    enricher.into_page().close().await;

    Ok(outcome)
}
