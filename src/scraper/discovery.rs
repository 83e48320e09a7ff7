use crate::errors::{FetchError, ParseError};
use crate::scraper::fetcher::DetailFetcher;
use crate::scraper::partition::page_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// What one results page said about its window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsPage {
    /// Absolute listing URLs, in page order, without repeats. Never empty.
    Links(Vec<String>),
    /// Empty page: the window has no more results.
    End,
    /// Page number above the cap; stop without fetching.
    Truncated,
}

/// Reads listing links off search-result pages.
pub struct ListingDiscoverer {
    base: Url,
    max_pages: u32,
    card: Selector,
    anchor: Selector,
}

impl ListingDiscoverer {
    pub fn new(base_url: &str, max_pages: u32) -> Result<Self, ParseError> {
        let base = Url::parse(base_url).map_err(|e| ParseError::Url {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let card = Selector::parse("div.property-item")
            .map_err(|e| ParseError::Selector(e.to_string()))?;
        let anchor =
            Selector::parse("a[href]").map_err(|e| ParseError::Selector(e.to_string()))?;

        Ok(Self {
            base,
            max_pages,
            card,
            anchor,
        })
    }

    /// Fetch page `page` of a window's search and pull its listing links.
    pub fn discover(
        &self,
        fetcher: &DetailFetcher,
        search_url: &str,
        page: u32,
    ) -> Result<ResultsPage, FetchError> {
        if page > self.max_pages {
            info!(page, max_pages = self.max_pages, "page cap reached, truncating window");
            return Ok(ResultsPage::Truncated);
        }

        let url = page_url(search_url, page);
        debug!(page, url = %url, "opening results page");
        let html = fetcher.fetch(&url, None)?;

        let links = self.extract_links(&html);
        if links.is_empty() {
            Ok(ResultsPage::End)
        } else {
            Ok(ResultsPage::Links(links))
        }
    }

    /// First link of every listing card, resolved against the site root.
    pub fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for card in document.select(&self.card) {
            let Some(href) = card
                .select(&self.anchor)
                .filter_map(|a| a.value().attr("href"))
                .find(|h| !h.trim().is_empty())
            else {
                continue;
            };

            match self.base.join(href.trim()) {
                Ok(url) => {
                    let url = url.to_string();
                    if seen.insert(url.clone()) {
                        links.push(url);
                    }
                }
                Err(e) => debug!(href, error = %e, "skipping unparseable link"),
            }
        }

        links
    }
}
