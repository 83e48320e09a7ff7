use crate::domain::{Category, ListingRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// State of one acquisition run, shared by every worker of that run.
///
/// Nothing here is process-wide: two runs (say, one per category) each own
/// their own context and never see each other's identifiers.
pub struct RunContext {
    category: Category,
    seen_urls: Mutex<HashSet<String>>,
    seen_ids: Mutex<HashSet<String>>,
    page_results: Mutex<HashMap<String, ListingRecord>>,
    stats: LinkStats,
}

/// Per-link outcome counters for the whole run.
#[derive(Debug, Default)]
pub struct LinkStats {
    pub fetched: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
}

impl LinkStats {
    pub fn snapshot(&self) -> (usize, usize, usize) {
        (
            self.fetched.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

// A worker that panicked mid-insert leaves the sets in a usable state.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RunContext {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            seen_urls: Mutex::new(HashSet::new()),
            seen_ids: Mutex::new(HashSet::new()),
            page_results: Mutex::new(HashMap::new()),
            stats: LinkStats::default(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Record a visit to `url`. False if it was already visited this run.
    pub fn mark_url(&self, url: &str) -> bool {
        lock(&self.seen_urls).insert(url.to_string())
    }

    pub fn is_claimed(&self, code: &str) -> bool {
        lock(&self.seen_ids).contains(code)
    }

    /// Claim `code` for this run. Exactly one caller wins per code.
    pub fn claim_id(&self, code: &str) -> bool {
        lock(&self.seen_ids).insert(code.to_string())
    }

    pub fn store_result(&self, record: ListingRecord) {
        lock(&self.page_results).insert(record.zimmo_code.clone(), record);
    }

    /// Drain what the current page produced.
    pub fn take_page_results(&self) -> Vec<ListingRecord> {
        let mut results = lock(&self.page_results);
        let mut records: Vec<ListingRecord> = results.drain().map(|(_, r)| r).collect();
        records.sort_by(|a, b| a.zimmo_code.cmp(&b.zimmo_code));
        records
    }
}
