//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted during a reconciliation or rename pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Filesystem scanning events
    Scan(ScanEvent),
    /// Content hashing events
    Hash(HashEvent),
    /// Record/file matching events
    Match(MatchEvent),
    /// Filesystem move events
    Move(MoveEvent),
    /// Pass-level events
    Pass(PassEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A candidate photo file was found
    FileFound { path: PathBuf },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Events during the hashing phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_files: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// An error occurred but hashing continues
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed { total_hashed: usize },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of files hashed so far
    pub completed: usize,
    /// Total number of files to hash
    pub total: usize,
    /// Current file being hashed
    pub current_path: PathBuf,
}

/// Events during the matching phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Matching has started
    Started { shared_groups: usize },
    /// Matching completed
    Completed {
        decisions: usize,
        unresolved: usize,
        missing: usize,
        unknown: usize,
    },
}

/// Events during filesystem moves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MoveEvent {
    /// Moving has started
    Started { total_intents: usize },
    /// A file was moved and its record committed
    Applied { record_id: i64, new_path: PathBuf },
    /// A move or its database commit failed; the batch continues
    Failed { record_id: i64, message: String },
    /// Moving completed
    Completed { applied: usize, failed: usize },
}

/// Pass-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PassEvent {
    /// The pass has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PassPhase },
    /// The pass completed
    Completed { duration_ms: u64 },
    /// The pass encountered a fatal error
    Error { message: String },
}

/// Phases of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassPhase {
    Scanning,
    Hashing,
    Matching,
    Committing,
    Moving,
}

impl std::fmt::Display for PassPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassPhase::Scanning => write!(f, "Scanning"),
            PassPhase::Hashing => write!(f, "Hashing"),
            PassPhase::Matching => write!(f, "Matching"),
            PassPhase::Committing => write!(f, "Committing"),
            PassPhase::Moving => write!(f, "Moving"),
        }
    }
}
