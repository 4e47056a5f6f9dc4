//! Error types for ratekeeper

use thiserror::Error;

/// Main error type for ratekeeper
///
/// Only storage backends, configuration loading and parsing helpers return
/// these. The log stores recover from every failure locally and never hand an
/// error back to their callers.
#[derive(Error, Debug)]
pub enum RateError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid history window: {0} days (expected 7, 30 or 90)")]
    InvalidWindow(u32),

    #[error("Calendar error: {0}")]
    CalendarError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[cfg(feature = "rusqlite-support")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

/// Result type alias for ratekeeper operations
pub type Result<T> = std::result::Result<T, RateError>;
