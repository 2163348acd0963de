//! # Matcher Module
//!
//! Pairs catalog records with found files inside each content-hash group.
//!
//! ## Matching rules
//! - Hash equality is the primary key: a record is never matched to a
//!   file with a different digest.
//! - A group with one record and one file matches directly - the bytes
//!   are identical, so the filenames are irrelevant.
//! - Duplicate-content groups are disambiguated by filename similarity
//!   with a deterministic greedy assignment.
//! - Leftovers are reported, never forced.
//!
//! The matcher is pure: it returns decisions and reports, and leaves
//! persistence to the caller.

mod similarity;

pub use similarity::{NormalizedLevenshtein, SimilarityMetric, TokenOverlap};

use crate::core::catalog::PhotoRecord;
use crate::core::index::HashIndex;
use crate::core::scanner::{normalized_basename, FoundFile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Similarity scores below this are never used for an assignment
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// Available similarity metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Normalized edit distance (default)
    Levenshtein,
    /// Character-bigram overlap, insensitive to token order
    TokenOverlap,
}

impl MetricKind {
    /// Build the metric for this kind
    pub fn metric(self) -> Box<dyn SimilarityMetric> {
        match self {
            MetricKind::Levenshtein => Box::new(NormalizedLevenshtein),
            MetricKind::TokenOverlap => Box::new(TokenOverlap),
        }
    }
}

/// How certain a match decision is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Sole record met sole file within a hash group
    Exact,
    /// Chosen by filename similarity within a duplicate-content group
    Fuzzy(f64),
}

/// One record resolved to one on-disk location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDecision {
    pub record_id: i64,
    /// Path the catalog currently stores
    pub stored_path: PathBuf,
    /// Path the file was actually found at
    pub resolved_path: PathBuf,
    pub confidence: Confidence,
}

impl MatchDecision {
    /// True when the file never moved and no update is needed
    pub fn is_noop(&self) -> bool {
        self.stored_path == self.resolved_path
    }
}

/// Why a record inside a shared hash group stayed unmatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Every remaining candidate scored below the usability threshold
    BelowThreshold,
    /// More records than files: the candidate pool ran out
    CandidatesExhausted,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::BelowThreshold => {
                write!(f, "no candidate filename was similar enough")
            }
            UnresolvedReason::CandidatesExhausted => {
                write!(f, "fewer files than records share this content")
            }
        }
    }
}

/// A record that could not be resolved within its hash group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedRecord {
    pub record_id: i64,
    pub stored_path: PathBuf,
    pub reason: UnresolvedReason,
}

/// Everything one matching pass produced
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MatchReport {
    /// Resolved (record, file) pairs
    pub decisions: Vec<MatchDecision>,
    /// Records in shared groups that stayed unmatched
    pub unresolved_records: Vec<UnresolvedRecord>,
    /// Files in shared groups that no record claimed
    pub unresolved_files: Vec<FoundFile>,
    /// Records whose content was not found on disk at all
    pub missing: Vec<PhotoRecord>,
    /// Files whose content the catalog does not know
    pub unknown: Vec<FoundFile>,
}

impl MatchReport {
    /// Decisions that actually change a stored path
    pub fn relocations(&self) -> impl Iterator<Item = &MatchDecision> {
        self.decisions.iter().filter(|d| !d.is_noop())
    }

    /// True when something needs human attention
    pub fn has_conflicts(&self) -> bool {
        !self.unresolved_records.is_empty()
    }

    /// Files no record claimed, in both the unknown and leftover pools.
    ///
    /// These are the candidates for importing into the catalog.
    pub fn unclaimed_files(&self) -> impl Iterator<Item = &FoundFile> {
        self.unknown.iter().chain(self.unresolved_files.iter())
    }
}

/// Pairs records with files using hash equality plus filename similarity
pub struct Matcher {
    metric: Box<dyn SimilarityMetric>,
    threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(Box::new(NormalizedLevenshtein), DEFAULT_SCORE_THRESHOLD)
    }
}

impl Matcher {
    pub fn new(metric: Box<dyn SimilarityMetric>, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    /// Match every hash group present on both sides.
    ///
    /// Deterministic given fixed input: groups are visited in hash
    /// order, and ties inside a group break by record id ascending,
    /// then file path lexicographic.
    pub fn run(
        &self,
        records: &HashIndex<PhotoRecord>,
        files: &HashIndex<FoundFile>,
    ) -> MatchReport {
        let mut report = MatchReport::default();

        for (hash, record_group) in records.iter() {
            match files.get(hash) {
                None => report.missing.extend(record_group.iter().cloned()),
                Some(file_group) => {
                    self.resolve_group(record_group, file_group, &mut report);
                }
            }
        }

        for (hash, file_group) in files.iter() {
            if !records.contains(hash) {
                report.unknown.extend(file_group.iter().cloned());
            }
        }

        tracing::debug!(
            decisions = report.decisions.len(),
            unresolved = report.unresolved_records.len(),
            missing = report.missing.len(),
            unknown = report.unknown.len(),
            "matching complete"
        );

        report
    }

    fn resolve_group(
        &self,
        record_group: &[PhotoRecord],
        file_group: &[FoundFile],
        report: &mut MatchReport,
    ) {
        // The common case: content exists exactly once on each side.
        // Hash equality alone suffices, whatever the filenames say.
        if record_group.len() == 1 && file_group.len() == 1 {
            let record = &record_group[0];
            report.decisions.push(MatchDecision {
                record_id: record.id,
                stored_path: record.path.clone(),
                resolved_path: file_group[0].path.clone(),
                confidence: Confidence::Exact,
            });
            return;
        }

        // Duplicate-content group: score every pair, then assign
        // greedily from the best score down.
        let mut records: Vec<&PhotoRecord> = record_group.iter().collect();
        records.sort_by_key(|r| r.id);
        let mut files: Vec<&FoundFile> = file_group.iter().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        struct ScoredPair<'a> {
            score: f64,
            record: &'a PhotoRecord,
            file: &'a FoundFile,
        }

        let mut pairs: Vec<ScoredPair> = Vec::with_capacity(records.len() * files.len());
        for &record in &records {
            let record_name = normalized_basename(&record.path);
            for &file in &files {
                pairs.push(ScoredPair {
                    score: self.metric.score(&record_name, &file.normalized_name()),
                    record,
                    file,
                });
            }
        }

        pairs.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record.id.cmp(&b.record.id))
                .then_with(|| a.file.path.cmp(&b.file.path))
        });

        let mut claimed_records: HashSet<i64> = HashSet::new();
        let mut claimed_files: HashSet<&PathBuf> = HashSet::new();

        for pair in &pairs {
            if pair.score < self.threshold {
                // Sorted descending, so nothing usable remains
                break;
            }
            if claimed_records.contains(&pair.record.id) || claimed_files.contains(&pair.file.path)
            {
                continue;
            }

            claimed_records.insert(pair.record.id);
            claimed_files.insert(&pair.file.path);
            report.decisions.push(MatchDecision {
                record_id: pair.record.id,
                stored_path: pair.record.path.clone(),
                resolved_path: pair.file.path.clone(),
                confidence: Confidence::Fuzzy(pair.score),
            });
        }

        let files_left = files.len() - claimed_files.len();
        for record in records {
            if !claimed_records.contains(&record.id) {
                report.unresolved_records.push(UnresolvedRecord {
                    record_id: record.id,
                    stored_path: record.path.clone(),
                    reason: if files_left > 0 {
                        UnresolvedReason::BelowThreshold
                    } else {
                        UnresolvedReason::CandidatesExhausted
                    },
                });
            }
        }
        for file in files {
            if !claimed_files.contains(&file.path) {
                report.unresolved_files.push((*file).clone());
            }
        }
    }
}
