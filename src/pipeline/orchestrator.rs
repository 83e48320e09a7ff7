use crate::config::Config;
use crate::db::{ListingStore, Table, IDENTITY_KEY};
use crate::domain::{Category, FallbackReason, RunSummary, WindowOutcome};
use crate::errors::PipelineError;
use crate::fallback::FallbackSource;
use crate::normalize::normalize;
use crate::pipeline::{RunContext, WorkerPool};
use crate::scraper::{
    code_from_url, page_url, search_url, DetailExtractor, DetailFetcher, ListingDiscoverer,
    PriceWindow, RangePartitioner, ResultsPage, Transport,
};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What happened to a single listing link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Stored,
    Skipped,
    Failed,
}

/// Drives one category through every price window and reports a [`RunSummary`].
///
/// Windows run one after the other, pages within a window one after the
/// other, and the links of a page go through the worker pool.
pub struct AcquisitionOrchestrator {
    base_url: String,
    partitioner: RangePartitioner,
    max_windows: usize,
    discoverer: ListingDiscoverer,
    extractor: DetailExtractor,
    fetcher: DetailFetcher,
    store: Arc<dyn ListingStore>,
    pool: WorkerPool,
}

impl AcquisitionOrchestrator {
    /// Validates everything up front; nothing here touches the network.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ListingStore>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let partitioner =
            RangePartitioner::new(config.price_start, config.price_ceiling, config.price_step)?;
        let discoverer = ListingDiscoverer::new(&config.base_url, config.max_pages)?;
        let extractor = DetailExtractor::new()?;
        let fetcher = DetailFetcher::new(transport, config.retry, config.base_url.clone());

        Ok(Self {
            base_url: config.base_url.clone(),
            partitioner,
            max_windows: config.max_windows,
            discoverer,
            extractor,
            fetcher,
            store,
            pool: WorkerPool::new(config.workers),
        })
    }

    /// One full acquisition for `category`. Always yields a summary; source
    /// failures end up in the summary, not in an error.
    pub fn run(&self, category: Category) -> RunSummary {
        let started = Instant::now();
        let ctx = RunContext::new(category);
        let mut summary = RunSummary::new(category);

        info!(category = %category, state = "partitioning", "starting acquisition run");

        for window in self.partitioner.windows().take(self.max_windows) {
            let label = window.label();
            info!(window = %label, state = "discovering", "entering price window");

            let (count, outcome) = self.harvest_window(&ctx, &window, &mut summary);
            info!(window = %label, count, outcome = ?outcome, "window finished");
            summary.record_window(label, count, outcome);
        }

        let (fetched, skipped, failed) = ctx.stats().snapshot();
        info!(
            state = "aggregating",
            total = summary.total_properties,
            fetched,
            skipped,
            failed,
            "all windows finished"
        );

        if summary.total_properties == 0 {
            let reason = if summary.failed_batches > 0 && fetched > 0 {
                FallbackReason::StoreUnavailable
            } else if summary.all_windows_unreachable() {
                FallbackReason::SourceUnreachable
            } else {
                FallbackReason::NoListings
            };
            self.serve_fallback(category, reason, &mut summary);
        } else {
            info!(state = "success", total = summary.total_properties, "live harvest succeeded");
        }

        summary.duration_seconds = started.elapsed().as_secs_f64();

        info!(state = "summarizing", "persisting run summary");
        if let Err(e) = self.store.save_summary(&summary) {
            error!(error = %e, "could not persist run summary");
        }

        info!(
            category = %category,
            state = "done",
            total = summary.total_properties,
            degraded = summary.is_degraded(),
            duration = summary.duration_seconds,
            "acquisition run complete"
        );
        summary
    }

    /// Paginate one window until it runs dry, hits the page cap, or the site stops answering.
    fn harvest_window(
        &self,
        ctx: &RunContext,
        window: &PriceWindow,
        summary: &mut RunSummary,
    ) -> (usize, WindowOutcome) {
        let search = search_url(&self.base_url, ctx.category(), window);
        let mut stored = 0;
        let mut page = 1;

        loop {
            match self.discoverer.discover(&self.fetcher, &search, page) {
                Ok(ResultsPage::Links(links)) => {
                    debug!(window = %window, page, links = links.len(), state = "fetching_page");
                    stored += self.harvest_page(ctx, &search, page, links, summary);
                    page += 1;
                }
                Ok(ResultsPage::End) => {
                    debug!(window = %window, page, "no more results");
                    return (stored, WindowOutcome::Exhausted);
                }
                Ok(ResultsPage::Truncated) => return (stored, WindowOutcome::Truncated),
                Err(e) => {
                    warn!(window = %window, page, error = %e, "results page unavailable, leaving window");
                    let outcome = if page == 1 {
                        WindowOutcome::Unreachable
                    } else {
                        WindowOutcome::Interrupted
                    };
                    return (stored, outcome);
                }
            }
        }
    }

    /// Fetch every link of one page through the pool, then upsert what came back.
    /// Returns the number of rows actually committed.
    fn harvest_page(
        &self,
        ctx: &RunContext,
        search: &str,
        page: u32,
        links: Vec<String>,
        summary: &mut RunSummary,
    ) -> usize {
        let referer = page_url(search, page);

        let panicked = self.pool.run(links, |url| {
            let counter = match self.process_link(ctx, &url, &referer) {
                LinkOutcome::Stored => &ctx.stats().fetched,
                LinkOutcome::Skipped => &ctx.stats().skipped,
                LinkOutcome::Failed => &ctx.stats().failed,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        });
        if panicked > 0 {
            warn!(page, panicked, "workers lost while processing page");
        }

        let records = ctx.take_page_results();
        if records.is_empty() {
            return 0;
        }

        match self.store.upsert(Table::Listings, &records, IDENTITY_KEY) {
            Ok(written) => written,
            Err(e) => {
                error!(page, rows = records.len(), error = %e, "listing write failed");
                let committed = e.committed();
                summary.record_write_failure(e);
                committed
            }
        }
    }

    fn process_link(&self, ctx: &RunContext, url: &str, referer: &str) -> LinkOutcome {
        if !ctx.mark_url(url) {
            debug!(url, "link already visited");
            return LinkOutcome::Skipped;
        }

        if let Some(code) = code_from_url(url) {
            if ctx.is_claimed(&code) || self.store.exists(&code) {
                debug!(url, code = %code, "listing already known, not fetching");
                return LinkOutcome::Skipped;
            }
        }

        let html = match self.fetcher.fetch(url, Some(referer)) {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "skipping listing");
                return LinkOutcome::Failed;
            }
        };

        let record = match self
            .extractor
            .extract(&html, url)
            .and_then(|raw| normalize(&raw, ctx.category(), Utc::now()))
        {
            Ok(record) => record,
            Err(e) => {
                warn!(url, error = %e, "dropping unparseable listing");
                return LinkOutcome::Failed;
            }
        };

        if self.store.exists(&record.zimmo_code) || !ctx.claim_id(&record.zimmo_code) {
            debug!(url, code = %record.zimmo_code, "duplicate listing");
            return LinkOutcome::Skipped;
        }

        debug!(url, code = %record.zimmo_code, "listing collected");
        ctx.store_result(record);
        LinkOutcome::Stored
    }

    fn serve_fallback(&self, category: Category, reason: FallbackReason, summary: &mut RunSummary) {
        warn!(
            category = %category,
            reason = reason.as_str(),
            state = "fallback_fetching",
            "live source produced nothing, switching to fallback dataset"
        );

        let records = FallbackSource::fetch(category);
        let written = match self.store.upsert(Table::SampleListings, &records, IDENTITY_KEY) {
            Ok(written) => written,
            Err(e) => {
                error!(error = %e, "fallback write failed");
                let committed = e.committed();
                summary.record_write_failure(e);
                committed
            }
        };

        summary.record_fallback(reason, written);
    }
}
