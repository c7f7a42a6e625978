use thiserror::Error;

/// Request-level ingestion failures. Any of these aborts the enclosing
/// transaction; row-level coercion problems never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid league name {name:?}: {reason}")]
    InvalidLeague { name: String, reason: String },
    #[error("invalid season name {name:?}: {reason}")]
    InvalidSeason { name: String, reason: String },
    #[error("sqlite error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("payload decode error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
