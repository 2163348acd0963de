//! # Scanner Module
//!
//! Discovers photo files under a root directory and pairs each one with
//! its content digest, producing the candidate pool the matcher consumes.
//!
//! ## Example
//! ```rust,ignore
//! use photo_relink::core::scanner::{ScanConfig, WalkScanner, Scanner};
//!
//! let scanner = WalkScanner::new(ScanConfig::default(), HashAlgorithm::Sha256.hasher());
//! let outcome = scanner.scan(Path::new("/photos"), &events)?;
//! ```

mod filter;
mod walker;

pub use filter::PhotoFilter;
pub use walker::{ScanConfig, WalkScanner};

use crate::core::hasher::ContentHash;
use crate::error::{HashError, ScanError};
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A photo file found on disk in the current pass.
///
/// Ephemeral: produced fresh each scan, never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundFile {
    /// Content digest of the file bytes
    pub hash: ContentHash,
    /// Absolute path where the file was found
    pub path: PathBuf,
}

impl FoundFile {
    /// Case-normalized basename, used for similarity scoring
    pub fn normalized_name(&self) -> String {
        normalized_basename(&self.path)
    }
}

/// Case-normalized basename of a path
pub fn normalized_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Result of a scan pass
#[derive(Debug)]
pub struct ScanOutcome {
    /// Files found and successfully digested
    pub files: Vec<FoundFile>,
    /// Non-fatal traversal errors
    pub scan_errors: Vec<ScanError>,
    /// Non-fatal digest errors
    pub hash_errors: Vec<HashError>,
}

/// Trait for scanners producing the candidate file pool.
///
/// Implement this to substitute a custom source (e.g. a fixture list
/// in tests).
pub trait Scanner: Send + Sync {
    /// Walk `root` and return the digested candidate pool.
    ///
    /// Fails only when the root itself is unusable; per-file problems
    /// are collected in the outcome.
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanOutcome, ScanError>;
}
