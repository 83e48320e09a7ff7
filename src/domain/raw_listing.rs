// src/domain/raw_listing.rs

use std::collections::HashMap;

/// A listing as lifted off the detail page, before any cleaning.
/// This is the boundary between page markup and the typed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    /// Site code as printed on the page (may still carry whitespace).
    pub code: String,
    /// Canonical page URL the listing was read from.
    pub url: String,
    /// Feature table: lowercase label -> value text (None when the row has no value).
    pub features: HashMap<String, Option<String>>,
    pub mobiscore: Option<String>,
}

impl RawListing {
    /// Text for a feature label, if the row exists and has a value.
    pub fn feature(&self, key: &str) -> Option<&str> {
        self.features.get(key).and_then(|v| v.as_deref())
    }
}
