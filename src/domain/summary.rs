// src/domain/summary.rs

use crate::domain::listing::Category;
use serde::{Serialize, Serializer};
use std::fmt::Write;

/// How pagination of one price window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowOutcome {
    /// An empty results page was reached.
    Exhausted,
    /// The page cap stopped pagination before results ran out.
    Truncated,
    /// The first results page could not be fetched.
    Unreachable,
    /// A later results page failed; earlier pages were harvested.
    Interrupted,
}

/// Why a run switched to the static dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The site answered but no window produced a listing.
    NoListings,
    /// Every window failed on its first results page.
    SourceUnreachable,
    /// Listings were collected but none of them could be written.
    StoreUnavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoListings => "no_listings",
            FallbackReason::SourceUnreachable => "source_unreachable",
            FallbackReason::StoreUnavailable => "store_unavailable",
        }
    }
}

/// Tally label used for rows served from the fallback dataset.
pub const FALLBACK_LABEL: &str = "sample_data";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowTally {
    pub label: String,
    pub count: usize,
    pub outcome: WindowOutcome,
}

/// Per-run aggregate. Built while the run progresses and persisted once at the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub category: Category,
    pub total_properties: usize,
    pub price_ranges_scraped: usize,
    pub duration_seconds: f64,
    /// Window label -> records upserted, in window order. Serialized as a map.
    #[serde(serialize_with = "tallies_as_map")]
    pub price_range_results: Vec<WindowTally>,
    pub fallback: Option<FallbackReason>,
    pub failed_batches: usize,
    pub write_errors: Vec<String>,
}

fn tallies_as_map<S: Serializer>(tallies: &[WindowTally], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(tallies.iter().map(|t| (&t.label, t.count)))
}

impl RunSummary {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            total_properties: 0,
            price_ranges_scraped: 0,
            duration_seconds: 0.0,
            price_range_results: Vec::new(),
            fallback: None,
            failed_batches: 0,
            write_errors: Vec::new(),
        }
    }

    pub fn record_window(&mut self, label: impl Into<String>, count: usize, outcome: WindowOutcome) {
        self.price_range_results.push(WindowTally {
            label: label.into(),
            count,
            outcome,
        });
        self.total_properties += count;
        self.price_ranges_scraped += 1;
    }

    /// Switch the run to degraded mode with `count` fallback rows stored.
    pub fn record_fallback(&mut self, reason: FallbackReason, count: usize) {
        self.fallback = Some(reason);
        self.total_properties = count;
        self.price_range_results.push(WindowTally {
            label: FALLBACK_LABEL.to_string(),
            count,
            outcome: WindowOutcome::Exhausted,
        });
    }

    pub fn record_write_failure(&mut self, error: impl ToString) {
        self.failed_batches += 1;
        self.write_errors.push(error.to_string());
    }

    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }

    /// True when every window that was attempted could not be reached.
    pub fn all_windows_unreachable(&self) -> bool {
        !self.price_range_results.is_empty()
            && self
                .price_range_results
                .iter()
                .all(|w| w.outcome == WindowOutcome::Unreachable)
    }

    pub fn count_for(&self, label: &str) -> Option<usize> {
        self.price_range_results
            .iter()
            .find(|w| w.label == label)
            .map(|w| w.count)
    }

    /// Human-readable end-of-run report.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=============== SCRAPING SUMMARY ({}) ===============", self.category);
        let _ = writeln!(out, "Total Properties: {}", self.total_properties);
        let _ = writeln!(out, "Price Ranges Scraped: {}", self.price_ranges_scraped);
        let _ = writeln!(out, "Duration: {:.2} seconds", self.duration_seconds);
        if let Some(reason) = self.fallback {
            let _ = writeln!(out, "Mode: DEGRADED (fallback dataset, {})", reason.as_str());
        }
        if self.failed_batches > 0 {
            let _ = writeln!(out, "Failed Batches: {}", self.failed_batches);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Results by Price Range:");
        for window in &self.price_range_results {
            let _ = writeln!(out, "  - {}: {} properties", window.label, window.count);
        }
        out.push_str(&"=".repeat(30));
        out
    }
}
