//! Item data model
//!
//! Discovery produces [`DiscoveredItem`]s, enrichment turns them into
//! [`EnrichedRecord`]s, and [`SeenSet`] keeps both stages from handling the
//! same item twice within a run.

mod record;
mod seen;

pub use record::{EnrichedRecord, FineMetric, RECORD_COLUMNS};
pub use seen::SeenSet;

/// Sentinel stored whenever a field cannot be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// An item found on the profile listing
///
/// Identity is `id` (the item's absolute address). Items are immutable once
/// emitted by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    /// Absolute item address
    pub id: String,

    /// Raw view count text as rendered on the listing, or the sentinel
    pub coarse_metric: String,
}

impl DiscoveredItem {
    /// Creates an item, substituting the sentinel for a blank metric
    pub fn new(id: impl Into<String>, coarse_metric: Option<String>) -> Self {
        Self {
            id: id.into(),
            coarse_metric: or_sentinel(coarse_metric),
        }
    }
}

/// Trims a raw field value and falls back to the sentinel when absent or blank
pub fn or_sentinel(raw: Option<String>) -> String {
    match raw {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => NOT_AVAILABLE.to_string(),
    }
}
