pub mod connection;
pub mod listings;
pub mod store;
pub mod summaries;

pub use connection::{init_db, Database};
pub use listings::{SqliteStore, DEFAULT_BATCH_SIZE};
pub use store::{ListingStore, Table, IDENTITY_KEY};
