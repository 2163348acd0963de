//! SQLite-backed catalog store.
//!
//! Uses WAL (Write-Ahead Logging) mode so a reader (e.g. a status
//! command) can proceed while a reconciliation pass writes.

use super::{AuditEntry, CatalogStore, CommitOutcome, OperationKind, PathChange, PhotoRecord};
use crate::core::hasher::ContentHash;
use crate::core::scanner::FoundFile;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite-backed persistent catalog
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCatalog {
    /// Open or create a catalog database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id INTEGER PRIMARY KEY,
                content_hash TEXT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                imported_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_hash ON photos(content_hash)",
            [],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                record_id INTEGER NOT NULL,
                old_path TEXT NOT NULL,
                new_path TEXT NOT NULL,
                operation TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_time ON audit_log(timestamp DESC)",
            [],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn corrupted(&self) -> StoreError {
        StoreError::Corrupted {
            path: self.db_path.clone(),
        }
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default()
    }
}

impl CatalogStore for SqliteCatalog {
    fn load_records(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| self.corrupted())?;

        let mut stmt = conn
            .prepare("SELECT id, content_hash, path, imported_at FROM photos ORDER BY id")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let records = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let path: String = row.get(2)?;
                let imported_at: String = row.get(3)?;

                Ok(PhotoRecord {
                    id,
                    content_hash: ContentHash::from_hex(hash),
                    path: PathBuf::from(path),
                    imported_at: Self::parse_timestamp(&imported_at),
                })
            })
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(records)
    }

    fn commit_changes(&self, changes: &[PathChange]) -> Vec<CommitOutcome> {
        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => {
                return changes
                    .iter()
                    .map(|c| CommitOutcome {
                        record_id: c.record_id,
                        result: Err(self.corrupted()),
                    })
                    .collect()
            }
        };

        let mut outcomes = Vec::with_capacity(changes.len());

        for change in changes {
            let result = commit_one(&mut conn, change);
            if let Err(ref e) = result {
                tracing::warn!(record_id = change.record_id, error = %e, "commit failed");
            }
            outcomes.push(CommitOutcome {
                record_id: change.record_id,
                result,
            });
        }

        outcomes
    }

    fn import_files(
        &self,
        files: &[FoundFile],
        imported_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| self.corrupted())?;

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO photos (content_hash, path, imported_at)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            for file in files {
                let count = stmt
                    .execute(params![
                        file.hash.as_str(),
                        file.path.to_string_lossy(),
                        imported_at.to_rfc3339(),
                    ])
                    .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
                inserted += count;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(inserted)
    }

    fn audit_log(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.conn.lock().map_err(|_| self.corrupted())?;

        let mut stmt = conn
            .prepare(
                "SELECT record_id, old_path, new_path, operation, timestamp
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let entries = stmt
            .query_map(params![limit], |row| {
                let record_id: i64 = row.get(0)?;
                let old_path: String = row.get(1)?;
                let new_path: String = row.get(2)?;
                let operation: String = row.get(3)?;
                let timestamp: String = row.get(4)?;

                Ok(AuditEntry {
                    record_id,
                    old_path: PathBuf::from(old_path),
                    new_path: PathBuf::from(new_path),
                    operation: OperationKind::parse(&operation)
                        .unwrap_or(OperationKind::Reconnect),
                    timestamp: Self::parse_timestamp(&timestamp),
                })
            })
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(entries)
    }
}

/// Apply one change as a single transaction: the stored-path update and
/// its audit row land together or not at all.
fn commit_one(conn: &mut Connection, change: &PathChange) -> Result<(), StoreError> {
    let tx = conn
        .transaction()
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

    let updated = tx
        .execute(
            "UPDATE photos SET path = ?1 WHERE id = ?2",
            params![change.new_path.to_string_lossy(), change.record_id],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                StoreError::PathTaken {
                    path: change.new_path.clone(),
                }
            } else {
                StoreError::QueryFailed(e.to_string())
            }
        })?;

    if updated == 0 {
        return Err(StoreError::RecordNotFound {
            record_id: change.record_id,
        });
    }

    tx.execute(
        "INSERT INTO audit_log (record_id, old_path, new_path, operation, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            change.record_id,
            change.old_path.to_string_lossy(),
            change.new_path.to_string_lossy(),
            change.operation.as_str(),
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

    tx.commit()
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
}
