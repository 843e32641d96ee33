//! Enriched record definitions
//!
//! A record is a discovered item plus the fine metrics read from the item's
//! own page.

use crate::item::{DiscoveredItem, NOT_AVAILABLE};
use std::collections::BTreeMap;
use std::fmt;

/// Column names in sink order
pub const RECORD_COLUMNS: [&str; 7] = [
    "Url",
    "Views",
    "Likes",
    "Comments",
    "Shares",
    "Caption",
    "UploadTime",
];

/// A metric only visible on an item's detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FineMetric {
    Likes,
    Comments,
    Shares,
    Caption,
    UploadTime,
}

impl FineMetric {
    /// All fine metrics, in sink column order
    pub const ALL: [FineMetric; 5] = [
        FineMetric::Likes,
        FineMetric::Comments,
        FineMetric::Shares,
        FineMetric::Caption,
        FineMetric::UploadTime,
    ];

    /// Column name used by sinks
    pub fn column(&self) -> &'static str {
        match self {
            Self::Likes => "Likes",
            Self::Comments => "Comments",
            Self::Shares => "Shares",
            Self::Caption => "Caption",
            Self::UploadTime => "UploadTime",
        }
    }
}

impl fmt::Display for FineMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A discovered item with its fine metrics attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    /// Absolute item address
    pub id: String,

    /// View count captured during discovery
    pub coarse_metric: String,

    /// Fine metrics by name; missing entries read as the sentinel
    pub fine_metrics: BTreeMap<FineMetric, String>,
}

impl EnrichedRecord {
    /// Creates a record with no fine metrics yet
    pub fn from_item(item: DiscoveredItem) -> Self {
        Self {
            id: item.id,
            coarse_metric: item.coarse_metric,
            fine_metrics: BTreeMap::new(),
        }
    }

    /// Sets a fine metric value
    pub fn set(&mut self, metric: FineMetric, value: String) {
        self.fine_metrics.insert(metric, value);
    }

    /// Builder-style variant of [`EnrichedRecord::set`]
    pub fn with(mut self, metric: FineMetric, value: impl Into<String>) -> Self {
        self.set(metric, value.into());
        self
    }

    /// Returns a fine metric value, or the sentinel if it was never set
    pub fn get(&self, metric: FineMetric) -> &str {
        self.fine_metrics
            .get(&metric)
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }

    /// Returns the record as a row matching [`RECORD_COLUMNS`]
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(RECORD_COLUMNS.len());
        row.push(self.id.clone());
        row.push(self.coarse_metric.clone());
        for metric in FineMetric::ALL {
            row.push(self.get(metric).to_string());
        }
        row
    }
}
