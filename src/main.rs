use crate::config::Config;
use crate::db::summaries::recent_summaries;
use crate::db::{init_db, Database, ListingStore, SqliteStore, Table, IDENTITY_KEY};
use crate::domain::{Category, RunSummary};
use crate::errors::PipelineError;
use crate::pipeline::AcquisitionOrchestrator;
use crate::scraper::HttpTransport;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod dashboard;
mod db;
mod domain;
mod errors;
mod fallback;
mod logging;
mod normalize;
mod pipeline;
mod scraper;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "immo_harvest", about = "Harvest property listings into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one acquisition for a single category
    Scrape {
        #[arg(long, value_enum)]
        category: Category,
    },
    /// Delete rows sharing the same key, keeping one
    Dedup {
        #[arg(long, default_value = "listings")]
        table: String,
        #[arg(long, default_value = IDENTITY_KEY)]
        key: String,
    },
    /// Write the dashboard JSON from stored listings
    Dashboard {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Apartments, houses, dedup, dashboard, final count
    Pipeline,
    /// Row count and recent runs
    Report,
}

fn main() -> Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Scrape { category } => {
            let store = open_store(&config)?;
            let summary = acquire(&config, store, category)?;
            fail_on_write_errors(&[summary])
        }
        Command::Dedup { table, key } => {
            let store = open_store(&config)?;
            dedup(&*store, &table, &key)
        }
        Command::Dashboard { out } => {
            let store = open_store(&config)?;
            let dir = out.unwrap_or_else(|| config.dashboard_dir.clone());
            generate_dashboard(&*store, &dir)
        }
        Command::Pipeline => run_pipeline(&config),
        Command::Report => {
            let store = open_store(&config)?;
            report(&store)
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let db = Database::open(config.db_path.clone())
        .and_then(|db| init_db(&db).map(|_| db))
        .map_err(PipelineError::Store)
        .with_context(|| format!("could not open database at {}", config.db_path))?;
    Ok(Arc::new(SqliteStore::new(db, config.batch_size)))
}

fn acquire(config: &Config, store: Arc<SqliteStore>, category: Category) -> Result<RunSummary> {
    let transport =
        HttpTransport::new(config.timeout).map_err(|e| PipelineError::Client(e.to_string()))?;
    let orchestrator = AcquisitionOrchestrator::new(config, Arc::new(transport), store)?;

    let summary = orchestrator.run(category);
    println!("{}", summary.report());
    Ok(summary)
}

fn fail_on_write_errors(summaries: &[RunSummary]) -> Result<()> {
    let failed: usize = summaries.iter().map(|s| s.failed_batches).sum();
    if failed > 0 {
        bail!("{failed} batch write(s) failed");
    }
    Ok(())
}

fn dedup(store: &dyn ListingStore, table: &str, key: &str) -> Result<()> {
    let deleted = store
        .purge_duplicates(table, key)
        .with_context(|| format!("duplicate purge on {table}.{key} failed"))?;
    println!("Removed {deleted} duplicate rows from {table}");
    Ok(())
}

fn generate_dashboard(store: &dyn ListingStore, dir: &std::path::Path) -> Result<()> {
    let records = store.read_all(Table::Listings)?;
    let Some(artifact) = dashboard::build(&records, Utc::now()) else {
        warn!("no listings stored, dashboard not written");
        println!("No data found in listings table");
        return Ok(());
    };

    let path = dashboard::write(dir, &artifact).context("could not write dashboard")?;
    println!("Dashboard saved to {}", path.display());
    println!("  - Total properties: {}", artifact.summary.total_properties);
    if let Some(avg) = artifact.summary.avg_price {
        println!("  - Average price: €{avg:.2}");
    }
    if let Some(stats) = &artifact.price_statistics {
        println!("  - Price range: €{:.0} - €{:.0}", stats.min, stats.max);
    }
    Ok(())
}

/// The scheduled task graph, in dependency order.
fn run_pipeline(config: &Config) -> Result<()> {
    info!(db = %config.db_path, "dependency check");
    let store = open_store(config)?;

    let mut summaries = Vec::new();
    for category in Category::ALL {
        summaries.push(acquire(config, Arc::clone(&store), category)?);
    }

    dedup(&*store, Table::Listings.as_str(), IDENTITY_KEY)?;
    generate_dashboard(&*store, &config.dashboard_dir)?;

    let total = store.count(Table::Listings)?;
    println!("Final row count in {}: {total}", Table::Listings.as_str());

    fail_on_write_errors(&summaries)
}

fn report(store: &SqliteStore) -> Result<()> {
    let total = store.count(Table::Listings)?;
    let samples = store.count(Table::SampleListings)?;
    println!("Listings: {total} (fallback rows: {samples})");

    let runs = store.database().with_conn(|conn| recent_summaries(conn, 10))?;
    for run in runs {
        println!(
            "#{} {} {:<9} total={} windows={} duration={:.2}s{}{}",
            run.id,
            run.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            run.category_type,
            run.total_properties,
            run.price_ranges_scraped,
            run.duration_seconds,
            run.fallback_reason
                .map(|r| format!(" degraded({r})"))
                .unwrap_or_default(),
            if run.failed_batches > 0 {
                format!(" failed_batches={}", run.failed_batches)
            } else {
                String::new()
            },
        );
    }
    Ok(())
}
