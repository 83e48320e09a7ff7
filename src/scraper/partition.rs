use crate::domain::Category;
use crate::errors::ConfigError;
use base64::Engine;
use serde_json::json;
use std::fmt;

/// Inclusive price bounds for one search. `max == None` is the open-ended tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceWindow {
    pub min: u64,
    pub max: Option<u64>,
}

impl PriceWindow {
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PriceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} - {}", self.min, max),
            None => write!(f, "{} - no max", self.min),
        }
    }
}

/// Splits `[start, ceiling]` into `step`-wide windows plus one open tail.
#[derive(Debug, Clone, Copy)]
pub struct RangePartitioner {
    start: u64,
    ceiling: u64,
    step: u64,
}

impl RangePartitioner {
    pub fn new(start: u64, ceiling: u64, step: u64) -> Result<Self, ConfigError> {
        if step == 0 {
            return Err(ConfigError::Zero("price step"));
        }
        if ceiling < start {
            return Err(ConfigError::InvertedRange { start, ceiling });
        }
        Ok(Self {
            start,
            ceiling,
            step,
        })
    }

    /// A fresh lazy sequence; call again to restart. Use `.take(n)` to cap work.
    pub fn windows(&self) -> PriceWindows {
        PriceWindows {
            next: Some(self.start),
            ceiling: self.ceiling,
            step: self.step,
        }
    }
}

/// Iterator over the windows of a [`RangePartitioner`].
#[derive(Debug, Clone)]
pub struct PriceWindows {
    /// Lower bound of the next window; `None` once the tail was emitted.
    next: Option<u64>,
    ceiling: u64,
    step: u64,
}

impl Iterator for PriceWindows {
    type Item = PriceWindow;

    fn next(&mut self) -> Option<PriceWindow> {
        let min = self.next?;

        if min > self.ceiling {
            self.next = None;
            return Some(PriceWindow { min, max: None });
        }

        // The last bounded window is clipped so the ceiling is always covered.
        let max = min.saturating_add(self.step - 1).min(self.ceiling);
        self.next = Some(max.saturating_add(1));
        if max == u64::MAX {
            self.next = None;
        }
        Some(PriceWindow {
            min,
            max: Some(max),
        })
    }
}

/// Search URL for every listing of `category` priced inside `window`.
///
/// The site takes its filter as base64-encoded JSON in the `search` parameter.
pub fn search_url(base_url: &str, category: Category, window: &PriceWindow) -> String {
    let mut range = json!({ "min": window.min });
    if let Some(max) = window.max {
        range["max"] = json!(max);
    }

    let query = json!({
        "filter": {
            "status": { "in": ["FOR_SALE", "TAKE_OVER"] },
            "category": { "in": [category.as_str()] },
            "price": { "unknown": false, "range": range }
        }
    });

    let encoded = base64::engine::general_purpose::STANDARD.encode(query.to_string());
    format!("{}/nl/zoeken/?search={}", base_url.trim_end_matches('/'), encoded)
}

/// URL of results page `page` (1-based) for a window's search URL.
pub fn page_url(search_url: &str, page: u32) -> String {
    if page <= 1 {
        search_url.to_string()
    } else {
        format!("{search_url}&p={page}")
    }
}
