use crate::domain::{Address, Category, ListingRecord};
use chrono::Utc;
use tracing::info;

/// Fixed dataset served when the live site yields nothing for a run.
/// Never touches the network.
pub struct FallbackSource;

struct Sample {
    code: &'static str,
    category: Category,
    price: f64,
    street: &'static str,
    number: &'static str,
    postcode: &'static str,
    city: &'static str,
    living_area_m2: f64,
    ground_area_m2: Option<f64>,
    bedroom: u32,
    bathroom: u32,
    garage: u32,
    garden: bool,
    epc_kwh_m2: f64,
    renovation_obligation: bool,
    year_built: i32,
    mobiscore: f64,
    url: &'static str,
}

const SAMPLES: [Sample; 3] = [
    Sample {
        code: "SAMPLE001",
        category: Category::House,
        price: 350_000.0,
        street: "Sample Street",
        number: "123",
        postcode: "1000",
        city: "Brussels",
        living_area_m2: 120.0,
        ground_area_m2: Some(300.0),
        bedroom: 3,
        bathroom: 2,
        garage: 1,
        garden: true,
        epc_kwh_m2: 150.0,
        renovation_obligation: false,
        year_built: 2010,
        mobiscore: 75.0,
        url: "https://example.com/property1",
    },
    Sample {
        code: "SAMPLE002",
        category: Category::Apartment,
        price: 250_000.0,
        street: "Test Avenue",
        number: "456",
        postcode: "2000",
        city: "Antwerp",
        living_area_m2: 85.0,
        ground_area_m2: None,
        bedroom: 2,
        bathroom: 1,
        garage: 0,
        garden: false,
        epc_kwh_m2: 120.0,
        renovation_obligation: true,
        year_built: 1995,
        mobiscore: 80.0,
        url: "https://example.com/property2",
    },
    Sample {
        code: "SAMPLE003",
        category: Category::House,
        price: 450_000.0,
        street: "Demo Road",
        number: "789",
        postcode: "3000",
        city: "Ghent",
        living_area_m2: 150.0,
        ground_area_m2: Some(500.0),
        bedroom: 4,
        bathroom: 3,
        garage: 2,
        garden: true,
        epc_kwh_m2: 100.0,
        renovation_obligation: false,
        year_built: 2015,
        mobiscore: 85.0,
        url: "https://example.com/property3",
    },
];

impl FallbackSource {
    /// Sample listings of `category`, stamped with the current time.
    pub fn fetch(category: Category) -> Vec<ListingRecord> {
        let now = Utc::now();
        let records: Vec<ListingRecord> = SAMPLES
            .iter()
            .filter(|s| s.category == category)
            .map(|s| ListingRecord {
                zimmo_code: s.code.to_string(),
                category: s.category,
                sub_type: None,
                price: Some(s.price),
                address: Address {
                    street: Some(s.street.to_string()),
                    number: Some(s.number.to_string()),
                    postcode: Some(s.postcode.to_string()),
                    city: Some(s.city.to_string()),
                },
                living_area_m2: Some(s.living_area_m2),
                ground_area_m2: s.ground_area_m2,
                bedroom: Some(s.bedroom),
                bathroom: Some(s.bathroom),
                garage: Some(s.garage),
                garden: s.garden,
                epc_kwh_m2: Some(s.epc_kwh_m2),
                renovation_obligation: Some(s.renovation_obligation),
                year_built: Some(s.year_built),
                mobiscore: Some(s.mobiscore),
                url: s.url.to_string(),
                scraped_at: now,
            })
            .collect();

        info!(category = %category, count = records.len(), "serving fallback dataset");
        records
    }
}
