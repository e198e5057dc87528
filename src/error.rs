//! Error types for the photo filer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo filer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo filer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No usable timestamp source for {}", .path.display())]
    NoTimestamp { path: PathBuf },

    #[error("Capture timestamps disagree for {}: {taken} vs {taken_original}", .path.display())]
    TimestampMismatch {
        path: PathBuf,
        taken: chrono::NaiveDateTime,
        taken_original: chrono::NaiveDateTime,
    },

    #[error("Could not find a free copy suffix for {}", .path.display())]
    CollisionUnresolved { path: PathBuf },

    #[error("Source directory does not exist: {}", .path.display())]
    SourceDirMissing { path: PathBuf },

    #[error("Failed to append to doubles list {}: {source}", .path.display())]
    DoublesList {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
