use crate::lint::Finding;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn raw text into a [`TimedDocument`](crate::TimedDocument).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No usable lyrics content found")]
    Empty,
}

/// Failure of an edit operation. The document is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Line index {index} is out of range (document has {len} lines)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Timestamp {timestamp_ms}ms for line {index} is negative")]
    NegativeTimestamp { index: usize, timestamp_ms: i64 },
}

/// Failure reported by a remote lyrics repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Lyrics repository {provider} unavailable: {reason}")]
    Unavailable { provider: String, reason: String },

    #[error("Lyrics repository {provider} rejected the request ({status}): {reason}")]
    Rejected {
        provider: String,
        status: u16,
        reason: String,
    },

    #[error("Cannot send to lyrics repository {provider}: {reason}")]
    InvalidRequest { provider: String, reason: String },
}

/// Failure of the fetch/publish policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("No lyrics found for {track}")]
    NotFound { track: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Publish blocked by {} lint finding(s)", findings.len())]
    Blocked { findings: Vec<Finding> },
}

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Lyrics errors
    #[error("Failed to parse LRC: {0}")]
    Parse(#[from] ParseError),

    #[error("Edit failed: {0}")]
    Edit(#[from] EditError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    // Storage errors
    #[error("Lyrics database error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // Audio tag errors
    #[error("Failed to embed lyrics in {path}: {reason}")]
    Tag { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
