use crate::domain::RunSummary;
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// A persisted run, as read back for reporting.
#[derive(Debug)]
pub struct SummaryRow {
    pub id: i64,
    pub category_type: String,
    pub total_properties: i64,
    pub price_ranges_scraped: i64,
    pub duration_seconds: f64,
    pub degraded: bool,
    pub fallback_reason: Option<String>,
    pub failed_batches: i64,
    pub recorded_at: DateTime<Utc>,
}

pub fn insert_summary(conn: &Connection, summary: &RunSummary) -> Result<(), StoreError> {
    let fallback_reason = summary.fallback.map(|r| r.as_str());

    conn.execute(
        "INSERT INTO scrape_summary (
            category_type, total_properties, price_ranges_scraped, duration_seconds,
            degraded, fallback_reason, failed_batches, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            summary.category.as_str(),
            summary.total_properties as i64,
            summary.price_ranges_scraped as i64,
            summary.duration_seconds,
            summary.is_degraded(),
            fallback_reason,
            summary.failed_batches as i64,
            Utc::now(),
        ],
    )?;
    Ok(())
}

pub fn recent_summaries(conn: &Connection, limit: usize) -> Result<Vec<SummaryRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, category_type, total_properties, price_ranges_scraped, duration_seconds,
                degraded, fallback_reason, failed_batches, recorded_at
         FROM scrape_summary ORDER BY id DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(SummaryRow {
            id: row.get(0)?,
            category_type: row.get(1)?,
            total_properties: row.get(2)?,
            price_ranges_scraped: row.get(3)?,
            duration_seconds: row.get(4)?,
            degraded: row.get(5)?,
            fallback_reason: row.get(6)?,
            failed_batches: row.get(7)?,
            recorded_at: row.get(8)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, FallbackReason, WindowOutcome};

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../../sql/schema.sql")).unwrap();
        conn
    }

    #[test]
    fn summaries_round_trip_newest_first() {
        let conn = memory_conn();

        let mut live = RunSummary::new(Category::House);
        live.record_window("0 - 49999", 4, WindowOutcome::Exhausted);
        live.duration_seconds = 12.5;
        insert_summary(&conn, &live).unwrap();

        let mut degraded = RunSummary::new(Category::Apartment);
        degraded.fallback = Some(FallbackReason::SourceUnreachable);
        insert_summary(&conn, &degraded).unwrap();

        let runs = recent_summaries(&conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].category_type, "APARTMENT");
        assert!(runs[0].degraded);
        assert_eq!(runs[0].fallback_reason.as_deref(), Some("source_unreachable"));
        assert_eq!(runs[1].total_properties, 4);
        assert_eq!(runs[1].duration_seconds, 12.5);
        assert!(!runs[1].degraded);
    }
}
