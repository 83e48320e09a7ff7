//! Raw feature text -> typed listing fields.
//!
//! Everything here is pure and tolerant: a missing or unreadable field becomes
//! `None`, never an error. The only hard requirement is a usable identifier.

mod address;
mod number;

pub use address::parse_address;
pub use number::{parse_number, parse_price, parse_year, Numeric};

use crate::domain::{Address, Category, ListingRecord, RawListing};
use crate::errors::ParseError;
use chrono::{DateTime, Utc};

/// Phrase marking an obligation as applicable.
pub const APPLICABLE: &str = "van toepassing";
/// Marker the site shows instead of a value it only discloses on request.
pub const ON_REQUEST: &str = "op aanvraag";

/// Feature labels as they appear (lowercased) on the detail page.
pub mod keys {
    pub const PRICE: &str = "prijs";
    pub const ADDRESS: &str = "adres";
    pub const LIVING_AREA: &str = "woonopp.";
    pub const PLOT_AREA: &str = "grondopp.";
    pub const BEDROOMS: &str = "slaapkamers";
    pub const BATHROOMS: &str = "badkamers";
    pub const GARAGES: &str = "garages";
    pub const GARDEN: &str = "tuin";
    pub const ENERGY: &str = "epc";
    pub const RENOVATION: &str = "renovatieplicht";
    pub const YEAR_BUILT: &str = "bouwjaar";
    pub const SUB_TYPE: &str = "type";
}

/// Strip the `Zimmo-code:` label and any whitespace from a printed code.
pub fn clean_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_label = match trimmed.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("zimmo-code") => rest,
        _ => trimmed,
    };
    let code: String = without_label.chars().filter(|c| !c.is_whitespace()).collect();
    (!code.is_empty()).then_some(code)
}

/// `true` for the applicable phrase, `false` for any other text.
pub fn parse_obligation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(APPLICABLE)
}

pub fn is_on_request(text: &str) -> bool {
    text.to_lowercase().contains(ON_REQUEST)
}

/// Build the canonical record for one listing.
pub fn normalize(
    raw: &RawListing,
    category: Category,
    scraped_at: DateTime<Utc>,
) -> Result<ListingRecord, ParseError> {
    let zimmo_code = clean_code(&raw.code).ok_or(ParseError::MissingIdentifier)?;
    let fields = Fields::new(raw);

    let number = |key: &str| fields.get(key).and_then(parse_number);

    Ok(ListingRecord {
        zimmo_code,
        category,
        sub_type: fields.get(keys::SUB_TYPE).map(|t| t.trim().to_string()),
        price: fields.get(keys::PRICE).and_then(parse_price),
        address: fields
            .get(keys::ADDRESS)
            .map(parse_address)
            .unwrap_or_else(Address::default),
        living_area_m2: number(keys::LIVING_AREA).map(Numeric::as_f64),
        ground_area_m2: number(keys::PLOT_AREA).map(Numeric::as_f64),
        bedroom: number(keys::BEDROOMS).and_then(Numeric::as_count),
        bathroom: number(keys::BATHROOMS).and_then(Numeric::as_count),
        garage: number(keys::GARAGES).and_then(Numeric::as_count),
        garden: fields.get(keys::GARDEN).is_some_and(|t| !t.trim().is_empty()),
        epc_kwh_m2: number(keys::ENERGY).map(Numeric::as_f64),
        renovation_obligation: fields.get(keys::RENOVATION).map(parse_obligation),
        year_built: fields.get(keys::YEAR_BUILT).and_then(parse_year),
        mobiscore: raw
            .mobiscore
            .as_deref()
            .filter(|t| !is_on_request(t))
            .and_then(parse_number)
            .map(Numeric::as_f64),
        url: raw.url.clone(),
        scraped_at,
    })
}

/// Feature view that blanks out on-request values.
struct Fields<'a> {
    raw: &'a RawListing,
}

impl<'a> Fields<'a> {
    fn new(raw: &'a RawListing) -> Self {
        Self { raw }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.raw.feature(key).filter(|v| !is_on_request(v))
    }
}
