use crate::domain::ListingRecord;
use crate::errors::ArtifactError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TOP_CITIES: usize = 20;
pub const LATEST_FILE: &str = "latest_dashboard.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub price_statistics: Option<PriceStatistics>,
    pub location_statistics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_properties: usize,
    pub avg_price: Option<f64>,
    pub property_types: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Sample standard deviation; absent for a single price.
    pub std: Option<f64>,
    pub count: usize,
}

/// Summarize stored listings. `None` when there is nothing to report.
///
/// Listings without a price are left out entirely.
pub fn build(records: &[ListingRecord], now: DateTime<Utc>) -> Option<Dashboard> {
    let priced: Vec<(&ListingRecord, f64)> = records
        .iter()
        .filter_map(|r| r.price.filter(|p| p.is_finite()).map(|p| (r, p)))
        .collect();

    if records.is_empty() {
        return None;
    }
    if priced.len() < records.len() {
        info!(dropped = records.len() - priced.len(), "ignoring listings without a price");
    }

    let mut property_types = BTreeMap::new();
    let mut cities: HashMap<&str, usize> = HashMap::new();
    for (record, _) in &priced {
        *property_types.entry(record.category.to_string()).or_insert(0) += 1;
        if let Some(city) = record.address.city.as_deref() {
            *cities.entry(city).or_insert(0) += 1;
        }
    }

    let mut prices: Vec<f64> = priced.iter().map(|(_, p)| *p).collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    Some(Dashboard {
        summary: DashboardSummary {
            total_properties: prices.len(),
            avg_price: mean(&prices),
            property_types,
            timestamp: now,
        },
        price_statistics: price_statistics(&prices),
        location_statistics: top_cities(cities),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// `sorted` must be ascending.
fn price_statistics(sorted: &[f64]) -> Option<PriceStatistics> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let n = sorted.len();

    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    let std = mean(sorted).filter(|_| n > 1).map(|avg| {
        let sq: f64 = sorted.iter().map(|p| (p - avg).powi(2)).sum();
        (sq / (n - 1) as f64).sqrt()
    });

    Some(PriceStatistics {
        min,
        max,
        median,
        std,
        count: n,
    })
}

fn top_cities(counts: HashMap<&str, usize>) -> BTreeMap<String, usize> {
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_CITIES)
        .map(|(city, n)| (city.to_string(), n))
        .collect()
}

/// Write the timestamped artifact and refresh the "latest" copy. Returns the timestamped path.
pub fn write(dir: &Path, dashboard: &Dashboard) -> Result<PathBuf, ArtifactError> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(dashboard)?;

    let stamped = dir.join(format!(
        "dashboard_{}.json",
        dashboard.summary.timestamp.format("%Y%m%d_%H%M%S")
    ));
    fs::write(&stamped, &json)?;
    fs::write(dir.join(LATEST_FILE), &json)?;

    info!(path = %stamped.display(), "dashboard written");
    Ok(stamped)
}
