use std::path::PathBuf;

use thiserror::Error;

/// A statement row that could not be decoded into date, description and amount.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}:{line}: {reason}", .path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub line: u64,
    pub reason: String,
}

/// A decoded row whose date or amount could not be coerced.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: cannot normalize {field} '{raw}': {reason}")]
pub struct NormalizationError {
    pub line: u64,
    pub field: &'static str,
    pub raw: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl LedgerError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
