//! Error type for tw-output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;
