//! # Catalog Module
//!
//! The system of record: photo records keyed by content hash, plus the
//! append-only audit log of applied path changes.
//!
//! The engine never issues raw queries; everything goes through the
//! [`CatalogStore`] trait so storage can be swapped (or mocked in
//! tests). The database is externally owned storage - records persist
//! across passes and other tools may prune or extend them between runs.

mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::core::hasher::ContentHash;
use crate::core::scanner::FoundFile;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A cataloged photo.
///
/// `path` is unique within the catalog; `content_hash` is not, since
/// duplicate photos share a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Stable surrogate key
    pub id: i64,
    pub content_hash: ContentHash,
    /// Where the catalog believes the file lives
    pub path: PathBuf,
    /// When the record was first imported
    pub imported_at: DateTime<Utc>,
}

/// What kind of path change an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The file moved on disk and the record was re-pointed at it
    Reconnect,
    /// The engine itself moved the file under a naming policy
    Rename,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Reconnect => "reconnect",
            OperationKind::Rename => "rename",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reconnect" => Some(OperationKind::Reconnect),
            "rename" => Some(OperationKind::Rename),
            _ => None,
        }
    }
}

/// Append-only record of one applied path change.
///
/// Written only after the corresponding filesystem state is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub record_id: i64,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub operation: OperationKind,
    pub timestamp: DateTime<Utc>,
}

/// A pending stored-path update for one record
#[derive(Debug, Clone)]
pub struct PathChange {
    pub record_id: i64,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub operation: OperationKind,
}

/// Per-item result of committing a batch of changes
#[derive(Debug)]
pub struct CommitOutcome {
    pub record_id: i64,
    pub result: Result<(), StoreError>,
}

/// The storage boundary for the reconciliation engine
pub trait CatalogStore: Send + Sync {
    /// Load every record in the catalog
    fn load_records(&self) -> Result<Vec<PhotoRecord>, StoreError>;

    /// Apply stored-path updates, each paired with its audit entry.
    ///
    /// Every change commits independently (update plus audit row in one
    /// transaction); a failing item never blocks the rest of the batch.
    fn commit_changes(&self, changes: &[PathChange]) -> Vec<CommitOutcome>;

    /// Insert found files as fresh records, returning how many were added.
    ///
    /// Files whose path is already cataloged are skipped, which makes
    /// repeated imports of the same tree idempotent.
    fn import_files(
        &self,
        files: &[FoundFile],
        imported_at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Read the audit trail, newest first
    fn audit_log(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_round_trips() {
        for kind in [OperationKind::Reconnect, OperationKind::Rename] {
            assert_eq!(OperationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OperationKind::parse("delete"), None);
    }
}
