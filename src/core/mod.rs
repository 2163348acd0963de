//! # Core Module
//!
//! The UI-agnostic path reconciliation engine.
//!
//! ## Modules
//! - `scanner` - discovers photo files and pairs them with content digests
//! - `hasher` - pluggable content digest implementations
//! - `index` - groups records and found files by content hash
//! - `matcher` - pairs catalog records with found files
//! - `planner` - computes and validates rename batches
//! - `mover` - applies moves to the filesystem, then the database
//! - `catalog` - the record store and audit log
//! - `pipeline` - orchestrates a full reconciliation pass

pub mod catalog;
pub mod hasher;
pub mod index;
pub mod matcher;
pub mod mover;
pub mod pipeline;
pub mod planner;
pub mod scanner;

// Re-export commonly used types
pub use catalog::{AuditEntry, CatalogStore, OperationKind, PhotoRecord, SqliteCatalog};
pub use hasher::{ContentHash, ContentHasher, HashAlgorithm};
pub use matcher::{Confidence, MatchDecision, MatchReport, Matcher, MetricKind};
pub use mover::{MoveReport, TransactionalMover};
pub use planner::{RenameBatch, RenameIntent, RenamePlanner};
pub use scanner::FoundFile;
