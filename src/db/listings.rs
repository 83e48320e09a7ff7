use crate::db::connection::Database;
use crate::db::store::{checked_identifier, ListingStore, Table};
use crate::db::summaries;
use crate::domain::{Address, Category, ListingRecord, RunSummary};
use crate::errors::StoreError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

/// Column order shared by every statement below.
const COLUMNS: [&str; 20] = [
    "zimmo_code",
    "category",
    "sub_type",
    "price",
    "street",
    "number",
    "postcode",
    "city",
    "living_area_m2",
    "ground_area_m2",
    "bedroom",
    "bathroom",
    "garage",
    "garden",
    "epc_kwh_m2",
    "renovation_obligation",
    "year_built",
    "mobiscore",
    "url",
    "scraped_at",
];

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// SQLite-backed [`ListingStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    batch_size: usize,
}

impl SqliteStore {
    pub fn new(db: Database, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn upsert_sql(table: Table, conflict_key: &str) -> Result<String, StoreError> {
    if !COLUMNS.contains(&conflict_key) {
        return Err(StoreError::InvalidIdentifier(conflict_key.to_string()));
    }

    let placeholders = (1..=COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = COLUMNS
        .iter()
        .filter(|c| **c != conflict_key)
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) \
         ON CONFLICT({conflict_key}) DO UPDATE SET {updates}",
        table = table.as_str(),
        columns = COLUMNS.join(", "),
    ))
}

fn write_batch(conn: &mut Connection, sql: &str, batch: &[ListingRecord]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(sql)?;
        for r in batch {
            stmt.execute(params![
                r.zimmo_code,
                r.category.as_str(),
                r.sub_type,
                r.price,
                r.address.street,
                r.address.number,
                r.address.postcode,
                r.address.city,
                r.living_area_m2,
                r.ground_area_m2,
                r.bedroom,
                r.bathroom,
                r.garage,
                r.garden,
                r.epc_kwh_m2,
                r.renovation_obligation,
                r.year_built,
                r.mobiscore,
                r.url,
                r.scraped_at,
            ])?;
        }
    }
    // Dropping an uncommitted transaction rolls it back.
    tx.commit()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ListingRecord> {
    let category: String = row.get(1)?;
    let category = category
        .parse::<Category>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;

    Ok(ListingRecord {
        zimmo_code: row.get(0)?,
        category,
        sub_type: row.get(2)?,
        price: row.get(3)?,
        address: Address {
            street: row.get(4)?,
            number: row.get(5)?,
            postcode: row.get(6)?,
            city: row.get(7)?,
        },
        living_area_m2: row.get(8)?,
        ground_area_m2: row.get(9)?,
        bedroom: row.get(10)?,
        bathroom: row.get(11)?,
        garage: row.get(12)?,
        garden: row.get(13)?,
        epc_kwh_m2: row.get(14)?,
        renovation_obligation: row.get(15)?,
        year_built: row.get(16)?,
        mobiscore: row.get(17)?,
        url: row.get(18)?,
        scraped_at: row.get(19)?,
    })
}

impl ListingStore for SqliteStore {
    fn exists(&self, zimmo_code: &str) -> bool {
        let found = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM listings WHERE zimmo_code = ?1 LIMIT 1",
                params![zimmo_code],
                |_| Ok(()),
            )
            .optional()
            .map_err(StoreError::from)
        });

        match found {
            Ok(hit) => hit.is_some(),
            Err(e) => {
                warn!(code = zimmo_code, error = %e, "existence check failed, treating listing as new");
                false
            }
        }
    }

    fn upsert(
        &self,
        table: Table,
        records: &[ListingRecord],
        conflict_key: &str,
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let sql = upsert_sql(table, conflict_key)?;

        let written = self.db.with_conn(|conn| {
            let mut committed = 0;
            for batch in records.chunks(self.batch_size) {
                write_batch(conn, &sql, batch)
                    .map_err(|source| StoreError::BatchFailed { committed, source })?;
                committed += batch.len();
                debug!(table = table.as_str(), rows = batch.len(), "batch committed");
            }
            Ok(committed)
        })?;

        info!(table = table.as_str(), rows = written, "upserted listings");
        Ok(written)
    }

    fn purge_duplicates(&self, table: &str, key: &str) -> Result<usize, StoreError> {
        let table = checked_identifier(table)?;
        let key = checked_identifier(key)?;

        // Lowest rowid survives; NULL keys are never treated as duplicates.
        let sql = format!(
            "DELETE FROM {table} WHERE {key} IS NOT NULL AND rowid NOT IN \
             (SELECT MIN(rowid) FROM {table} WHERE {key} IS NOT NULL GROUP BY {key})"
        );

        let deleted = self
            .db
            .with_conn(|conn| conn.execute(&sql, []).map_err(StoreError::from))?;

        info!(table, key, deleted, "duplicate purge finished");
        Ok(deleted)
    }

    fn read_all(&self, table: Table) -> Result<Vec<ListingRecord>, StoreError> {
        let sql = format!("SELECT {} FROM {}", COLUMNS.join(", "), table.as_str());

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_record)?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
    }

    fn count(&self, table: Table) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(n.max(0) as usize)
        })
    }

    fn save_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.db
            .with_conn(|conn| summaries::insert_summary(conn, summary))?;
        info!(
            category = %summary.category,
            total = summary.total_properties,
            "saved run summary"
        );
        Ok(())
    }
}
