//! # Hasher Module
//!
//! Pluggable content digests used as the primary key for matching.
//!
//! ## Algorithms
//! - `Sha256` (default) - cryptographic digest; collisions are treated as
//!   impossible, so hash equality means byte-identical content
//! - `Xxh3` - fast non-cryptographic digest for large trusted collections
//!
//! The digest is computed over raw file bytes, never decoded pixels, so
//! any file type can be cataloged.

mod read;

pub use read::read_file_bytes;

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// A content digest rendered as lowercase hex.
///
/// Equality of two `ContentHash` values is the engine's proxy for
/// byte-identical file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already-computed hex digest (e.g. read back from the catalog)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        ContentHash(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines and pretty output
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Available digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 - cryptographic, the default
    Sha256,
    /// XXH3 (64-bit) - much faster, adequate for trusted collections
    Xxh3,
}

impl HashAlgorithm {
    /// Build the hasher for this algorithm
    pub fn hasher(self) -> Box<dyn ContentHasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
            HashAlgorithm::Xxh3 => Box::new(Xxh3Hasher),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Xxh3 => write!(f, "xxh3"),
        }
    }
}

/// Trait for content digest implementations
pub trait ContentHasher: Send + Sync {
    /// Digest an in-memory byte slice
    fn digest_bytes(&self, bytes: &[u8]) -> ContentHash;

    /// Digest a file's content.
    ///
    /// Large files are read through a memory map to avoid the kernel
    /// copy overhead; small files go through `fs::read`.
    fn digest_file(&self, path: &Path) -> Result<ContentHash, HashError> {
        let bytes = read_file_bytes(path)?;
        Ok(self.digest_bytes(bytes.as_ref()))
    }

    /// The algorithm this hasher implements
    fn algorithm(&self) -> HashAlgorithm;
}

/// SHA-256 content hasher
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest_bytes(&self, bytes: &[u8]) -> ContentHash {
        let digest = Sha256::digest(bytes);
        ContentHash(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// XXH3 content hasher
pub struct Xxh3Hasher;

impl ContentHasher for Xxh3Hasher {
    fn digest_bytes(&self, bytes: &[u8]) -> ContentHash {
        ContentHash(format!("{:016x}", xxh3_64(bytes)))
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Xxh3
    }
}
