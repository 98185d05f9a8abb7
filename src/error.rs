use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that reach a caller. Unparsable prices, filtered rows and empty
/// scrape results are recovered where they happen and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("price source unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("price table not found on webpage")]
    DataNotFound,

    #[error("orange not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage path error: {0}")]
    Io(#[from] std::io::Error),
}
