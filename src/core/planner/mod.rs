//! # Planner Module
//!
//! Computes and validates rename batches before anything touches the
//! filesystem. Validation is decoupled from execution on purpose: the
//! whole batch can be previewed (and confirmed by a human) with zero
//! side effects, then handed to the mover.
//!
//! ## Validation rules, in order, each a hard stop for the intent
//! 1. The record's current path must exist on disk.
//! 2. If the proposed path exists it must hold byte-identical content;
//!    anything else is a naming collision.
//! 3. No two intents in a batch may share a target; colliding intents
//!    are all rejected rather than silently reordered.

mod metadata;
mod policy;

pub use metadata::{extract_metadata, PhotoMetadata};
pub use policy::{NamingPolicy, SplitDirs, TemplateConfig, TemplatePolicy};

use crate::core::catalog::PhotoRecord;
use crate::core::hasher::ContentHasher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A validated wish to move one record's file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameIntent {
    pub record_id: i64,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

/// Why an intent was excluded from the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The record's stored path no longer resolves to a file
    MissingSource,
    /// The target exists on disk with different content
    CollidesWithExisting { path: PathBuf },
    /// Another intent in this batch wants the same target
    CollidesWithPending { other_record: i64 },
    /// The naming policy could not produce a proposal
    PolicyFailed { message: String },
    /// The existing target could not be digested for comparison
    HashCheckFailed { message: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingSource => write!(f, "stored path does not exist"),
            RejectReason::CollidesWithExisting { path } => {
                write!(f, "target exists with different content: {}", path.display())
            }
            RejectReason::CollidesWithPending { other_record } => {
                write!(f, "target also proposed for record {}", other_record)
            }
            RejectReason::PolicyFailed { message } => write!(f, "naming policy: {}", message),
            RejectReason::HashCheckFailed { message } => {
                write!(f, "could not verify existing target: {}", message)
            }
        }
    }
}

/// An intent excluded from the batch, with its reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedIntent {
    pub record_id: i64,
    pub old_path: PathBuf,
    pub reason: RejectReason,
}

/// The planner's output: what to execute and what to report
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RenameBatch {
    /// Intents that passed every validation rule
    pub intents: Vec<RenameIntent>,
    /// Excluded intents with reasons, for the caller to present
    pub rejected: Vec<RejectedIntent>,
    /// Records whose proposal equals their current path
    pub unchanged: usize,
}

impl RenameBatch {
    pub fn has_work(&self) -> bool {
        !self.intents.is_empty()
    }
}

/// Validates rename proposals against disk state and each other
pub struct RenamePlanner<'a> {
    policy: &'a dyn NamingPolicy,
    hasher: &'a dyn ContentHasher,
}

impl<'a> RenamePlanner<'a> {
    pub fn new(policy: &'a dyn NamingPolicy, hasher: &'a dyn ContentHasher) -> Self {
        Self { policy, hasher }
    }

    /// Build a validated batch for the given records.
    ///
    /// Pure apart from reading disk state; nothing is moved or written.
    pub fn plan(&self, records: &[PhotoRecord]) -> RenameBatch {
        let mut batch = RenameBatch::default();
        let mut candidates: Vec<RenameIntent> = Vec::new();

        for record in records {
            if !record.path.exists() {
                batch.rejected.push(RejectedIntent {
                    record_id: record.id,
                    old_path: record.path.clone(),
                    reason: RejectReason::MissingSource,
                });
                continue;
            }

            let metadata = extract_metadata(&record.path);
            let new_path = match self.policy.propose(record, &metadata) {
                Ok(path) => path,
                Err(e) => {
                    batch.rejected.push(RejectedIntent {
                        record_id: record.id,
                        old_path: record.path.clone(),
                        reason: RejectReason::PolicyFailed {
                            message: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            if new_path == record.path {
                batch.unchanged += 1;
                continue;
            }

            if new_path.exists() {
                match self.hasher.digest_file(&new_path) {
                    Ok(hash) if hash == record.content_hash => {
                        // Byte-identical target: overwriting loses nothing
                    }
                    Ok(_) => {
                        batch.rejected.push(RejectedIntent {
                            record_id: record.id,
                            old_path: record.path.clone(),
                            reason: RejectReason::CollidesWithExisting { path: new_path },
                        });
                        continue;
                    }
                    Err(e) => {
                        batch.rejected.push(RejectedIntent {
                            record_id: record.id,
                            old_path: record.path.clone(),
                            reason: RejectReason::HashCheckFailed {
                                message: e.to_string(),
                            },
                        });
                        continue;
                    }
                }
            }

            candidates.push(RenameIntent {
                record_id: record.id,
                old_path: record.path.clone(),
                new_path,
            });
        }

        // Batch-internal target collisions: every party is rejected,
        // none is arbitrarily preferred.
        let mut by_target: HashMap<&PathBuf, Vec<usize>> = HashMap::new();
        for (i, intent) in candidates.iter().enumerate() {
            by_target.entry(&intent.new_path).or_default().push(i);
        }

        let mut colliding: Vec<(usize, i64)> = Vec::new();
        for indices in by_target.values() {
            if indices.len() > 1 {
                for &i in indices {
                    let other = indices
                        .iter()
                        .find(|&&j| j != i)
                        .map(|&j| candidates[j].record_id)
                        .unwrap_or(candidates[i].record_id);
                    colliding.push((i, other));
                }
            }
        }

        let colliding_map: HashMap<usize, i64> = colliding.into_iter().collect();
        for (i, intent) in candidates.into_iter().enumerate() {
            match colliding_map.get(&i) {
                Some(&other_record) => batch.rejected.push(RejectedIntent {
                    record_id: intent.record_id,
                    old_path: intent.old_path,
                    reason: RejectReason::CollidesWithPending { other_record },
                }),
                None => batch.intents.push(intent),
            }
        }

        tracing::info!(
            planned = batch.intents.len(),
            rejected = batch.rejected.len(),
            unchanged = batch.unchanged,
            "rename batch validated"
        );

        batch
    }
}
