mod discovery;
mod extract;
mod fetcher;
mod partition;

pub use discovery::{ListingDiscoverer, ResultsPage};
pub use extract::{code_from_url, DetailExtractor};
pub use fetcher::{DelayRange, DetailFetcher, FetchedPage, HttpTransport, RetryPolicy, Transport};
pub use partition::{page_url, search_url, PriceWindow, RangePartitioner};
