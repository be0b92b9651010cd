//! Core data types for targets, observations, and collected prices.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One configured asset to scrape. Identity is `asset_symbol`.
///
/// The short keys `ccy`, `url`, and `selector` are accepted when reading
/// target files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    #[serde(alias = "ccy")]
    pub asset_symbol: String,
    #[serde(alias = "url")]
    pub page_url: String,
    #[serde(alias = "selector")]
    pub element_selector: String,
}

impl Target {
    pub fn new(
        asset_symbol: impl Into<String>,
        page_url: impl Into<String>,
        element_selector: impl Into<String>,
    ) -> Self {
        Self {
            asset_symbol: asset_symbol.into(),
            page_url: page_url.into(),
            element_selector: element_selector.into(),
        }
    }
}

/// Text read from the price element once the wait protocol settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    pub text: String,
    pub observed_at: DateTime<Utc>,
}

/// A normalized price row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub currency: String,
    /// Page URL the price was read from.
    pub source: String,
}

/// A target that was skipped during collation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFailure {
    pub asset_symbol: String,
    pub error: String,
}

/// Per-run tally of attempted, succeeded, and failed targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<TargetFailure>,
}

/// Records collected in one run, in configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// Identifier of the run that produced these records.
    pub run_id: String,
    pub records: Vec<PriceRecord>,
    pub summary: CollationSummary,
}

impl ResultSet {
    /// Number of collected records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the record for a currency symbol.
    pub fn get(&self, currency: &str) -> Option<&PriceRecord> {
        self.records.iter().find(|r| r.currency == currency)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PriceRecord;
    type IntoIter = std::slice::Iter<'a, PriceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
