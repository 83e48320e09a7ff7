// src/domain/listing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search category on the listing site. Each run harvests exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    House,
    Apartment,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Apartment, Category::House];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::House => "HOUSE",
            Category::Apartment => "APARTMENT",
        }
    }

    /// Path segment the site uses for detail pages of this category.
    pub fn url_segment(&self) -> &'static str {
        match self {
            Category::House => "huis",
            Category::Apartment => "appartement",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOUSE" => Ok(Category::House),
            "APARTMENT" => Ok(Category::Apartment),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Address split out of the site's "street number, postcode city" line.
/// Every part is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
}

/// One normalized listing, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub zimmo_code: String,
    pub category: Category,
    pub sub_type: Option<String>,
    pub price: Option<f64>,

    #[serde(flatten)]
    pub address: Address,

    pub living_area_m2: Option<f64>,
    pub ground_area_m2: Option<f64>,
    pub bedroom: Option<u32>,
    pub bathroom: Option<u32>,
    pub garage: Option<u32>,
    pub garden: bool,
    pub epc_kwh_m2: Option<f64>,
    pub renovation_obligation: Option<bool>,
    pub year_built: Option<i32>,
    pub mobiscore: Option<f64>,

    pub url: String,
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// A bare record with only identity fields set.
    pub fn new(zimmo_code: impl Into<String>, category: Category, url: impl Into<String>) -> Self {
        Self {
            zimmo_code: zimmo_code.into(),
            category,
            sub_type: None,
            price: None,
            address: Address::default(),
            living_area_m2: None,
            ground_area_m2: None,
            bedroom: None,
            bathroom: None,
            garage: None,
            garden: false,
            epc_kwh_m2: None,
            renovation_obligation: None,
            year_built: None,
            mobiscore: None,
            url: url.into(),
            scraped_at: Utc::now(),
        }
    }
}
