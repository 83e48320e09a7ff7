pub mod listing;
pub mod raw_listing;
pub mod summary;

pub use listing::{Address, Category, ListingRecord};
pub use raw_listing::RawListing;
pub use summary::{FallbackReason, RunSummary, WindowOutcome, FALLBACK_LABEL};
