//! # Error Module
//!
//! Error types for the catalog relinker.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, record ids, what went wrong
//! - **Per-item errors stay in reports** - one bad record never aborts the
//!   rest of a batch; only whole-input failures surface through these types
//! - **Dangerous inconsistencies are loud** - a file moved on disk whose
//!   database update failed is a distinct, high-severity error

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum RelinkError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Catalog error: {0}")]
    Store(#[from] StoreError),

    #[error("Rename planning error: {0}")]
    Plan(#[from] PolicyError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while scanning the filesystem tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while computing content digests
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the catalog database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open catalog database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Catalog corruption detected at {path}. Restore from backup before retrying.")]
    Corrupted { path: PathBuf },

    #[error("No catalog record with id {record_id}")]
    RecordNotFound { record_id: i64 },

    #[error("Stored path is already claimed by another record: {path}")]
    PathTaken { path: PathBuf },
}

/// Errors from a naming policy while proposing a new path
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("No capture or file timestamp available for {path}")]
    MissingTimestamp { path: PathBuf },

    #[error("Pattern {pattern:?} did not match path {path}")]
    NoRegexMatch { pattern: String, path: PathBuf },

    #[error("Unknown template tag {{{tag}}}")]
    UnknownTag { tag: String },

    #[error("Invalid rename template: {0}")]
    InvalidTemplate(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, RelinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/vacation"));
    }

    #[test]
    fn store_error_suggests_recovery() {
        let error = StoreError::Corrupted {
            path: PathBuf::from("/data/catalog.db"),
        };
        let message = error.to_string();
        assert!(message.contains("Restore from backup"));
    }

    #[test]
    fn policy_error_names_the_tag() {
        let error = PolicyError::UnknownTag {
            tag: "frame".to_string(),
        };
        assert!(error.to_string().contains("{frame}"));
    }
}
