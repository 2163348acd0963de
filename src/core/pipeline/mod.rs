//! # Pipeline Module
//!
//! Orchestrates one reconciliation pass: scan, hash, index, match,
//! commit. Reconnects are database-only updates - the files already
//! moved on disk, so only the stored paths need re-pointing.
//!
//! ## Example
//! ```rust,ignore
//! let outcome = Reconciler::builder()
//!     .root("/photos")
//!     .dry_run(true)
//!     .build()
//!     .run(&catalog, &events)?;
//! ```

use crate::core::catalog::{CatalogStore, OperationKind, PathChange};
use crate::core::hasher::HashAlgorithm;
use crate::core::index::HashIndex;
use crate::core::matcher::{MatchReport, Matcher, MetricKind, DEFAULT_SCORE_THRESHOLD};
use crate::core::scanner::{ScanConfig, Scanner, WalkScanner};
use crate::error::Result;
use crate::events::{Event, EventSender, MatchEvent, PassEvent, PassPhase};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// A stored-path update that could not be committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFailure {
    pub record_id: i64,
    pub message: String,
}

/// Everything one reconciliation pass produced
#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Unique id of this pass, for log correlation
    pub pass_id: String,
    /// The matcher's full report
    pub report: MatchReport,
    /// Stored paths actually updated in the catalog
    pub updated: usize,
    /// Updates that failed to commit
    pub commit_failures: Vec<CommitFailure>,
    /// Non-fatal scan problems, rendered for display
    pub scan_errors: Vec<String>,
    /// Non-fatal digest problems, rendered for display
    pub hash_errors: Vec<String>,
    pub duration_ms: u64,
    pub dry_run: bool,
}

impl ReconcileOutcome {
    /// Records whose stored path differs from where their file was found
    pub fn relocations_found(&self) -> usize {
        self.report.relocations().count()
    }

    /// True when something needs human attention
    pub fn needs_attention(&self) -> bool {
        self.report.has_conflicts() || !self.commit_failures.is_empty()
    }
}

/// Builder for [`Reconciler`]
#[derive(Debug, Default)]
pub struct ReconcilerBuilder {
    root: PathBuf,
    recursive: Option<bool>,
    include_hidden: bool,
    algorithm: Option<HashAlgorithm>,
    metric: Option<MetricKind>,
    threshold: Option<f64>,
    dry_run: bool,
}

impl ReconcilerBuilder {
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn metric(mut self, metric: MetricKind) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Reconciler {
        Reconciler {
            root: self.root,
            scan: ScanConfig {
                recursive: self.recursive.unwrap_or(true),
                include_hidden: self.include_hidden,
                ..Default::default()
            },
            algorithm: self.algorithm.unwrap_or(HashAlgorithm::Sha256),
            metric: self.metric.unwrap_or(MetricKind::Levenshtein),
            threshold: self.threshold.unwrap_or(DEFAULT_SCORE_THRESHOLD),
            dry_run: self.dry_run,
        }
    }
}

/// Runs reconciliation passes against a catalog and a directory tree
pub struct Reconciler {
    root: PathBuf,
    scan: ScanConfig,
    algorithm: HashAlgorithm,
    metric: MetricKind,
    threshold: f64,
    dry_run: bool,
}

impl Reconciler {
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::default()
    }

    /// Run one pass.
    ///
    /// Fatal errors are limited to whole-input preconditions: the scan
    /// root or the catalog being unusable. Everything per-item lands in
    /// the outcome instead.
    pub fn run(&self, store: &dyn CatalogStore, events: &EventSender) -> Result<ReconcileOutcome> {
        let start = Instant::now();
        let pass_id = Uuid::new_v4().to_string();
        events.send(Event::Pass(PassEvent::Started));

        tracing::info!(pass_id = %pass_id, root = %self.root.display(), "reconciliation pass starting");

        let records = store.load_records().map_err(|e| {
            events.send(Event::Pass(PassEvent::Error {
                message: e.to_string(),
            }));
            e
        })?;

        events.send(Event::Pass(PassEvent::PhaseChanged {
            phase: PassPhase::Scanning,
        }));
        let scanner = WalkScanner::new(self.scan.clone(), self.algorithm.hasher());
        let scanned = scanner.scan(&self.root, events).map_err(|e| {
            events.send(Event::Pass(PassEvent::Error {
                message: e.to_string(),
            }));
            e
        })?;

        events.send(Event::Pass(PassEvent::PhaseChanged {
            phase: PassPhase::Matching,
        }));
        let record_index = HashIndex::build(records);
        let file_index = HashIndex::build(scanned.files);

        let shared_groups = record_index
            .iter()
            .filter(|(hash, _)| file_index.contains(*hash))
            .count();
        events.send(Event::Match(MatchEvent::Started { shared_groups }));

        let matcher = Matcher::new(self.metric.metric(), self.threshold);
        let report = matcher.run(&record_index, &file_index);

        events.send(Event::Match(MatchEvent::Completed {
            decisions: report.decisions.len(),
            unresolved: report.unresolved_records.len(),
            missing: report.missing.len(),
            unknown: report.unknown.len(),
        }));

        let changes: Vec<PathChange> = report
            .relocations()
            .map(|d| PathChange {
                record_id: d.record_id,
                old_path: d.stored_path.clone(),
                new_path: d.resolved_path.clone(),
                operation: OperationKind::Reconnect,
            })
            .collect();

        let mut updated = 0;
        let mut commit_failures = Vec::new();

        if !self.dry_run && !changes.is_empty() {
            events.send(Event::Pass(PassEvent::PhaseChanged {
                phase: PassPhase::Committing,
            }));
            for outcome in store.commit_changes(&changes) {
                match outcome.result {
                    Ok(()) => updated += 1,
                    Err(e) => commit_failures.push(CommitFailure {
                        record_id: outcome.record_id,
                        message: e.to_string(),
                    }),
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        events.send(Event::Pass(PassEvent::Completed { duration_ms }));

        tracing::info!(
            pass_id = %pass_id,
            updated,
            unresolved = report.unresolved_records.len(),
            missing = report.missing.len(),
            unknown = report.unknown.len(),
            "reconciliation pass finished"
        );

        Ok(ReconcileOutcome {
            pass_id,
            report,
            updated,
            commit_failures,
            scan_errors: scanned.scan_errors.iter().map(|e| e.to_string()).collect(),
            hash_errors: scanned.hash_errors.iter().map(|e| e.to_string()).collect(),
            duration_ms,
            dry_run: self.dry_run,
        })
    }

    /// Scan, match, and insert every file no record claimed.
    ///
    /// Returns the number of records added. Re-running over the same
    /// tree adds nothing, since claimed and already-cataloged files are
    /// skipped.
    pub fn import_new(&self, store: &dyn CatalogStore, events: &EventSender) -> Result<usize> {
        let preview = Reconciler {
            root: self.root.clone(),
            scan: self.scan.clone(),
            algorithm: self.algorithm,
            metric: self.metric,
            threshold: self.threshold,
            dry_run: true,
        };

        let outcome = preview.run(store, events)?;
        let unclaimed: Vec<_> = outcome.report.unclaimed_files().cloned().collect();

        if unclaimed.is_empty() {
            return Ok(0);
        }

        let added = store.import_files(&unclaimed, Utc::now())?;
        tracing::info!(added, "imported unclaimed files");
        Ok(added)
    }
}
