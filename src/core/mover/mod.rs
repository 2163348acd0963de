//! # Mover Module
//!
//! Applies validated rename intents: filesystem first, database second.
//!
//! ## Protocol, per intent
//! 1. Create the destination directory chain (idempotent).
//! 2. Move the file. On failure the intent is reported and the database
//!    stays untouched for that record; the batch continues.
//! 3. Only after the move is confirmed, commit the stored-path update
//!    and its audit entry. A database failure at this point leaves the
//!    file at its new location - that inconsistency is surfaced as a
//!    distinct high-severity outcome and never retried automatically,
//!    since a blind retry risks double-moves.
//!
//! The ordering means the catalog never references a path that does not
//! exist, which is the worse failure mode for a tool whose whole job is
//! locating files.

use crate::core::catalog::{CatalogStore, OperationKind, PathChange};
use crate::core::planner::RenameIntent;
use crate::events::{Event, EventSender, MoveEvent};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    /// File moved and record committed
    Applied,
    /// mkdir or the move itself failed; nothing changed for this record
    FilesystemFailed { message: String },
    /// File moved but the database commit failed afterwards.
    ///
    /// Requires manual reconciliation: the catalog still shows the old
    /// path while the file lives at the new one.
    InconsistentCommit { message: String },
}

/// Result of applying one intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub record_id: i64,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub status: MoveStatus,
}

/// Results of applying a batch
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MoveReport {
    pub outcomes: Vec<MoveOutcome>,
}

impl MoveReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == MoveStatus::Applied)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.applied()
    }

    /// Outcomes needing manual attention (file moved, record stale)
    pub fn inconsistent(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, MoveStatus::InconsistentCommit { .. }))
    }
}

/// Applies rename intents with filesystem-then-database ordering
pub struct TransactionalMover<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> TransactionalMover<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Apply a validated batch.
    ///
    /// Partial-failure semantics: each intent is atomic on its own and
    /// a failure never rolls back or blocks the others.
    pub fn apply(&self, intents: &[RenameIntent], events: &EventSender) -> MoveReport {
        events.send(Event::Move(MoveEvent::Started {
            total_intents: intents.len(),
        }));

        let mut report = MoveReport::default();

        for intent in intents {
            let status = self.apply_one(intent);

            match &status {
                MoveStatus::Applied => {
                    events.send(Event::Move(MoveEvent::Applied {
                        record_id: intent.record_id,
                        new_path: intent.new_path.clone(),
                    }));
                }
                MoveStatus::FilesystemFailed { message }
                | MoveStatus::InconsistentCommit { message } => {
                    tracing::warn!(
                        record_id = intent.record_id,
                        error = %message,
                        "rename intent failed"
                    );
                    events.send(Event::Move(MoveEvent::Failed {
                        record_id: intent.record_id,
                        message: message.clone(),
                    }));
                }
            }

            report.outcomes.push(MoveOutcome {
                record_id: intent.record_id,
                old_path: intent.old_path.clone(),
                new_path: intent.new_path.clone(),
                status,
            });
        }

        events.send(Event::Move(MoveEvent::Completed {
            applied: report.applied(),
            failed: report.failed(),
        }));

        report
    }

    fn apply_one(&self, intent: &RenameIntent) -> MoveStatus {
        if let Some(parent) = intent.new_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return MoveStatus::FilesystemFailed {
                    message: format!("create {}: {}", parent.display(), e),
                };
            }
        }

        if let Err(e) = move_file(&intent.old_path, &intent.new_path) {
            return MoveStatus::FilesystemFailed {
                message: e.to_string(),
            };
        }

        // The move is confirmed on disk; now, and only now, the record
        let outcomes = self.store.commit_changes(&[PathChange {
            record_id: intent.record_id,
            old_path: intent.old_path.clone(),
            new_path: intent.new_path.clone(),
            operation: OperationKind::Rename,
        }]);

        match outcomes.into_iter().next() {
            Some(outcome) => match outcome.result {
                Ok(()) => MoveStatus::Applied,
                Err(e) => MoveStatus::InconsistentCommit {
                    message: e.to_string(),
                },
            },
            None => MoveStatus::InconsistentCommit {
                message: "store returned no commit outcome".to_string(),
            },
        }
    }
}

/// Move a file, falling back to copy+verify+delete across filesystems
fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::rename(source, dest).or_else(|_| {
        // rename fails across filesystems; copy with size verification
        // before the source is deleted
        let source_size = fs::metadata(source)?.len();
        fs::copy(source, dest)?;

        let dest_size = fs::metadata(dest)?.len();
        if dest_size != source_size {
            // Incomplete copy: keep the source
            let _ = fs::remove_file(dest);
            return Err(std::io::Error::other(format!(
                "copy verification failed: source {} bytes, dest {} bytes",
                source_size, dest_size
            )));
        }

        fs::remove_file(source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{AuditEntry, CommitOutcome, PhotoRecord, SqliteCatalog};
    use crate::core::hasher::Sha256Hasher;
    use crate::core::hasher::ContentHasher;
    use crate::core::scanner::FoundFile;
    use crate::error::StoreError;
    use crate::events::null_sender;
    use chrono::{DateTime, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn intent(record_id: i64, old: &Path, new: &Path) -> RenameIntent {
        RenameIntent {
            record_id,
            old_path: old.to_path_buf(),
            new_path: new.to_path_buf(),
        }
    }

    fn seeded_catalog(dir: &TempDir, files: &[(&Path, &[u8])]) -> SqliteCatalog {
        let catalog = SqliteCatalog::open(&dir.path().join("catalog.db")).unwrap();
        let found: Vec<FoundFile> = files
            .iter()
            .map(|(path, content)| FoundFile {
                hash: Sha256Hasher.digest_bytes(content),
                path: path.to_path_buf(),
            })
            .collect();
        catalog.import_files(&found, Utc::now()).unwrap();
        catalog
    }

    #[test]
    fn successful_move_updates_disk_and_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("a.jpg");
        fs::write(&old, b"bytes").unwrap();
        let new = temp_dir.path().join("2023").join("renamed.jpg");

        let catalog = seeded_catalog(&temp_dir, &[(&old, b"bytes")]);
        let record_id = catalog.load_records().unwrap()[0].id;

        let mover = TransactionalMover::new(&catalog);
        let report = mover.apply(&[intent(record_id, &old, &new)], &null_sender());

        assert_eq!(report.applied(), 1);
        assert!(!old.exists());
        assert!(new.exists());
        assert_eq!(catalog.load_records().unwrap()[0].path, new);

        let audit = catalog.audit_log(None).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].operation, OperationKind::Rename);
    }

    #[test]
    fn destination_directories_are_created() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("a.jpg");
        fs::write(&old, b"bytes").unwrap();
        let new = temp_dir.path().join("x").join("y").join("z").join("a.jpg");

        let catalog = seeded_catalog(&temp_dir, &[(&old, b"bytes")]);
        let record_id = catalog.load_records().unwrap()[0].id;

        let mover = TransactionalMover::new(&catalog);
        let report = mover.apply(&[intent(record_id, &old, &new)], &null_sender());

        assert_eq!(report.applied(), 1);
        assert!(new.exists());
    }

    #[test]
    fn filesystem_failure_leaves_catalog_untouched_and_batch_continues() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("vanished.jpg");
        let good = temp_dir.path().join("good.jpg");
        fs::write(&good, b"good").unwrap();

        let catalog = seeded_catalog(&temp_dir, &[(&missing, b"gone"), (&good, b"good")]);
        let records = catalog.load_records().unwrap();

        let mover = TransactionalMover::new(&catalog);
        let report = mover.apply(
            &[
                intent(records[0].id, &missing, &temp_dir.path().join("m.jpg")),
                intent(records[1].id, &good, &temp_dir.path().join("g.jpg")),
            ],
            &null_sender(),
        );

        assert_eq!(report.applied(), 1);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[0].status,
            MoveStatus::FilesystemFailed { .. }
        ));

        // The failed record still shows its old path
        let records = catalog.load_records().unwrap();
        assert_eq!(records[0].path, missing);
        assert_eq!(records[1].path, temp_dir.path().join("g.jpg"));
    }

    /// Store whose commits always fail, to exercise the moved-but-unrecorded path
    struct BrokenStore;

    impl CatalogStore for BrokenStore {
        fn load_records(&self) -> Result<Vec<PhotoRecord>, StoreError> {
            Ok(Vec::new())
        }

        fn commit_changes(&self, changes: &[PathChange]) -> Vec<CommitOutcome> {
            changes
                .iter()
                .map(|c| CommitOutcome {
                    record_id: c.record_id,
                    result: Err(StoreError::QueryFailed("disk full".to_string())),
                })
                .collect()
        }

        fn import_files(
            &self,
            _files: &[FoundFile],
            _imported_at: DateTime<Utc>,
        ) -> Result<usize, StoreError> {
            Ok(0)
        }

        fn audit_log(&self, _limit: Option<usize>) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn commit_failure_after_move_reports_inconsistent_commit() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("a.jpg");
        fs::write(&old, b"bytes").unwrap();
        let new = temp_dir.path().join("moved.jpg");

        let store = BrokenStore;
        let mover = TransactionalMover::new(&store);
        let report = mover.apply(&[intent(1, &old, &new)], &null_sender());

        // The file did move; the inconsistency is reported, not hidden
        assert!(new.exists());
        assert!(!old.exists());
        assert_eq!(report.applied(), 0);
        assert_eq!(report.inconsistent().count(), 1);
        assert!(matches!(
            report.outcomes[0].status,
            MoveStatus::InconsistentCommit { .. }
        ));
    }
}
