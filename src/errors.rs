// errors.rs
use thiserror::Error;

/// Failures while talking to the listing site.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Blocked by site (HTTP 403)")]
    Forbidden,
    #[error("HTTP {0}")]
    Http(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Blocks and dropped connections get the long backoff.
    pub fn is_hostile(&self) -> bool {
        matches!(
            self,
            FetchError::Forbidden | FetchError::Transport(_) | FetchError::Timeout
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Structural problems with a downloaded page.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Listing identifier not found")]
    MissingIdentifier,
    #[error("Feature block not found")]
    MissingFeatures,
    #[error("Invalid selector: {0}")]
    Selector(String),
    #[error("Invalid URL {url}: {reason}")]
    Url { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Batch write failed after {committed} committed rows: {source}")]
    BatchFailed {
        committed: usize,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Refusing to use '{0}' as a SQL identifier")]
    InvalidIdentifier(String),
    #[error("Schema error: {0}")]
    Schema(String),
}

impl StoreError {
    /// Rows that made it to disk before the failure.
    pub fn committed(&self) -> usize {
        match self {
            StoreError::BatchFailed { committed, .. } => *committed,
            _ => 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Price ceiling {ceiling} is below start {start}")]
    InvertedRange { start: u64, ceiling: u64 },
}

/// Errors that stop a run before any network activity.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("HTTP client could not be built: {0}")]
    Client(String),
    #[error("Scraper setup failed: {0}")]
    Setup(#[from] ParseError),
}

/// Failures writing the dashboard artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
