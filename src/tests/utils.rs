use crate::config::Config;
use crate::db::{init_db, Database, SqliteStore};
use crate::errors::FetchError;
use crate::scraper::{FetchedPage, RetryPolicy, Transport};
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const BASE: &str = "https://www.zimmo.be";

fn unique_name(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{nanos}"))
}

/// Fresh SQLite file with the production schema applied.
pub fn init_test_db() -> Database {
    let path = unique_name("immo_test").with_extension("sqlite3");
    let db = Database::open(path.to_string_lossy().into_owned())
        .unwrap_or_else(|e| panic!("Database open failed: {e}"));
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db
}

pub fn test_store(batch_size: usize) -> SqliteStore {
    SqliteStore::new(init_test_db(), batch_size)
}

/// Four windows (0-49999, 50000-99999, 100000-100000, open tail), no delays.
pub fn test_config() -> Config {
    Config {
        base_url: BASE.to_string(),
        price_start: 0,
        price_ceiling: 100_000,
        price_step: 50_000,
        max_pages: 5,
        workers: 2,
        batch_size: 2,
        retry: RetryPolicy::without_delays(2),
        timeout: Duration::from_secs(1),
        dashboard_dir: unique_name("immo_dash"),
        ..Config::default()
    }
}

/// In-memory stand-in for the listing site.
///
/// Unknown search pages answer with an empty result list, unknown detail
/// pages with a 404.
pub struct FakeSite {
    pages: HashMap<String, FetchedPage>,
    down: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            down: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails at the connection level.
    pub fn unreachable() -> Self {
        Self {
            down: true,
            ..Self::new()
        }
    }

    pub fn page(mut self, url: impl Into<String>, body: String) -> Self {
        self.pages.insert(url.into(), FetchedPage { status: 200, body });
        self
    }

    pub fn status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(
            url.into(),
            FetchedPage {
                status,
                body: String::new(),
            },
        );
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for FakeSite {
    fn get(&self, url: &str, _headers: HeaderMap) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.down {
            return Err(FetchError::Transport("connection reset by peer".into()));
        }
        if let Some(page) = self.pages.get(url) {
            return Ok(page.clone());
        }
        if url.contains("/nl/zoeken/") {
            return Ok(FetchedPage {
                status: 200,
                body: results_html(&[]),
            });
        }
        Ok(FetchedPage {
            status: 404,
            body: String::new(),
        })
    }
}

pub fn results_html(links: &[&str]) -> String {
    let cards: String = links
        .iter()
        .map(|l| format!(r#"<div class="property-item"><a href="{l}">listing</a></div>"#))
        .collect();
    format!("<html><body><div class=\"results\">{cards}</div></body></html>")
}

pub fn detail_html(code: &str, price: &str, address: &str) -> String {
    format!(
        r#"<html><body>
          <p class="zimmo-code">Zimmo-code: {code}</p>
          <section id="main-features"><ul>
            <li><strong class="feature-label">Prijs</strong><span class="feature-value">{price}</span></li>
            <li><strong class="feature-label">Adres</strong><span class="feature-value">{address}</span></li>
            <li><strong class="feature-label">Slaapkamers</strong><span class="feature-value">3</span></li>
            <li><strong class="feature-label">Renovatieplicht</strong><span class="feature-value">Van toepassing</span></li>
          </ul></section>
        </body></html>"#
    )
}

pub fn house_url(city: &str, code: &str) -> String {
    format!("{BASE}/nl/{city}/te-koop/huis/{code}/")
}
