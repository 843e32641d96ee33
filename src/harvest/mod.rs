//! Harvest pipeline
//!
//! This module contains the two stages and the wiring between them:
//! - Link discovery by scrolling the profile listing
//! - Metadata enrichment by visiting each item
//! - The hand-off queue that connects them in streaming mode
//! - The coordinator that runs them and merges their reports

mod coordinator;
mod discovery;
mod enrichment;
mod queue;

pub use coordinator::{run_harvest, Coordinator, HarvestOutcome};
pub use discovery::{Discoverer, DiscoveryReport, ListingSelectors, StopReason};
pub use enrichment::{Enricher, EnrichmentFailure, EnrichmentReport};
pub use queue::{handoff, HandoffReceiver, HandoffSender, ItemSink, ItemSource};

use crate::config::Config;
use crate::HarvestError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How discovery and enrichment are wired together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Discover everything, then enrich the full list
    Batch,
    /// Enrich items while discovery is still scrolling
    #[default]
    Streaming,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Self::Batch),
            "streaming" | "stream" => Ok(Self::Streaming),
            other => Err(format!(
                "unknown pipeline mode '{}', expected 'batch' or 'streaming'",
                other
            )),
        }
    }
}

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Build the profile address from the configured handle
/// 2. Launch one browser session per stage
/// 3. Run discovery and enrichment in the configured mode
/// 4. Close both sessions
///
/// Persisting the outcome is left to the caller (see [`crate::output`]).
///
/// # Arguments
///
/// * `config` - A fully validated configuration, target included
///
/// # Returns
///
/// * `Ok(HarvestOutcome)` - Run finished, possibly with partial results
/// * `Err(HarvestError)` - The run could not be started
pub async fn harvest(config: &Config) -> Result<HarvestOutcome, HarvestError> {
    run_harvest(config).await
}
