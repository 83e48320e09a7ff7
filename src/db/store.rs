use crate::domain::{ListingRecord, RunSummary};
use crate::errors::StoreError;

/// Listing tables the pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Live harvest.
    Listings,
    /// Fallback dataset, kept apart from live rows.
    SampleListings,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Listings => "listings",
            Table::SampleListings => "listings_sample",
        }
    }
}

/// Column every listing table is unique on.
pub const IDENTITY_KEY: &str = "zimmo_code";

/// Persistence seen by the pipeline. Implementations are shared by all
/// workers of a run.
pub trait ListingStore: Send + Sync {
    /// Is this code already stored in the live table?
    /// A store that cannot answer says `false`.
    fn exists(&self, zimmo_code: &str) -> bool;

    /// Insert or overwrite rows keyed by `conflict_key`, in bounded batches,
    /// one transaction per batch. Returns the number of rows written.
    fn upsert(
        &self,
        table: Table,
        records: &[ListingRecord],
        conflict_key: &str,
    ) -> Result<usize, StoreError>;

    /// Delete all but one row for every repeated `key` value. Returns rows deleted.
    fn purge_duplicates(&self, table: &str, key: &str) -> Result<usize, StoreError>;

    fn read_all(&self, table: Table) -> Result<Vec<ListingRecord>, StoreError>;

    fn count(&self, table: Table) -> Result<usize, StoreError>;

    /// Append one run-summary row.
    fn save_summary(&self, summary: &RunSummary) -> Result<(), StoreError>;
}

/// Plain SQL identifier: ASCII letters, digits, underscores, not starting with a digit.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn checked_identifier(name: &str) -> Result<&str, StoreError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("zimmo_code"));
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("listings; DROP TABLE listings"));
        assert!(!is_identifier(""));
    }
}
