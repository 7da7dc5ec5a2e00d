pub type Result<T> = std::result::Result<T, Error>;

pub const STOPPED_BY_USER: &str = "stopped by user";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("indexing is already running")]
    AlreadyRunning,

    #[error("indexing is not running")]
    NotRunning,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("page is outside the configured sites: {0}")]
    OutsideConfiguredSites(String),

    #[error("empty search query")]
    EmptyQuery,

    #[error("site is not indexed: {0}")]
    UnknownSite(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("duplicate {kind}: {key}")]
    Duplicate { kind: &'static str, key: String },

    #[error("crawl failed: {0}")]
    Crawl(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors caused by the caller's input rather than by the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::AlreadyRunning
                | Error::NotRunning
                | Error::InvalidUrl(_)
                | Error::OutsideConfiguredSites(_)
                | Error::EmptyQuery
                | Error::UnknownSite(_)
        )
    }
}
