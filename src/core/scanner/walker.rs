//! Directory walking implementation using walkdir.
//!
//! The walk itself is sequential; digesting the discovered files is
//! embarrassingly parallel and fans out over rayon.

use super::{FoundFile, PhotoFilter, ScanOutcome, Scanner};
use crate::core::hasher::ContentHasher;
use crate::error::{HashError, ScanError};
use crate::events::{Event, EventSender, HashEvent, HashProgress, ScanEvent};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to descend into subdirectories
    pub recursive: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            include_hidden: false,
            extensions: None,
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkScanner {
    config: ScanConfig,
    filter: PhotoFilter,
    hasher: Box<dyn ContentHasher>,
}

impl WalkScanner {
    /// Create a new scanner with the given configuration and digest
    pub fn new(config: ScanConfig, hasher: Box<dyn ContentHasher>) -> Self {
        let mut filter = PhotoFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self {
            config,
            filter,
            hasher,
        }
    }

    /// Collect candidate file paths under the root
    fn collect_candidates(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<(Vec<PathBuf>, Vec<ScanError>), ScanError> {
        if !root.exists() || !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut candidates = Vec::new();
        let mut errors = Vec::new();

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    if path.is_dir() {
                        // Skip hidden directories unless configured otherwise
                        if !self.config.include_hidden {
                            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                                if name.starts_with('.') && path != root {
                                    continue;
                                }
                            }
                        }
                        continue;
                    }

                    if !self.filter.should_include(path) {
                        continue;
                    }

                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: path.to_path_buf(),
                    }));
                    candidates.push(path.to_path_buf());
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        // Stable input order for the downstream matcher
        candidates.sort();

        Ok((candidates, errors))
    }
}

impl Scanner for WalkScanner {
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanOutcome, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let (candidates, scan_errors) = self.collect_candidates(root, events)?;

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: candidates.len(),
        }));
        events.send(Event::Hash(HashEvent::Started {
            total_files: candidates.len(),
        }));

        let completed = AtomicUsize::new(0);
        let total = candidates.len();

        // Each file digests independently; no shared mutable state
        let digests: Vec<Result<FoundFile, HashError>> = candidates
            .par_iter()
            .map(|path| {
                let result = self.hasher.digest_file(path).map(|hash| FoundFile {
                    hash,
                    path: path.clone(),
                });

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                events.send(Event::Hash(HashEvent::Progress(HashProgress {
                    completed: done,
                    total,
                    current_path: path.clone(),
                })));

                if let Err(ref e) = result {
                    events.send(Event::Hash(HashEvent::Error {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                }

                result
            })
            .collect();

        let mut files = Vec::with_capacity(digests.len());
        let mut hash_errors = Vec::new();
        for result in digests {
            match result {
                Ok(file) => files.push(file),
                Err(e) => hash_errors.push(e),
            }
        }

        events.send(Event::Hash(HashEvent::Completed {
            total_hashed: files.len(),
        }));

        tracing::info!(
            found = files.len(),
            scan_errors = scan_errors.len(),
            hash_errors = hash_errors.len(),
            "scan finished"
        );

        Ok(ScanOutcome {
            files,
            scan_errors,
            hash_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::HashAlgorithm;
    use crate::events::null_sender;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn scanner(config: ScanConfig) -> WalkScanner {
        WalkScanner::new(config, HashAlgorithm::Sha256.hasher())
    }

    fn create_photo(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn scan_empty_directory_returns_empty_pool() {
        let temp_dir = TempDir::new().unwrap();

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        assert!(outcome.files.is_empty());
        assert!(outcome.scan_errors.is_empty());
    }

    #[test]
    fn scan_digests_each_photo() {
        let temp_dir = TempDir::new().unwrap();
        create_photo(temp_dir.path(), "a.jpg", b"first");
        create_photo(temp_dir.path(), "b.jpg", b"second");

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        assert_eq!(outcome.files.len(), 2);
        assert_ne!(outcome.files[0].hash, outcome.files[1].hash);
    }

    #[test]
    fn identical_content_yields_identical_hashes() {
        let temp_dir = TempDir::new().unwrap();
        create_photo(temp_dir.path(), "a.jpg", b"same bytes");
        create_photo(temp_dir.path(), "copy of a.jpg", b"same bytes");

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files[0].hash, outcome.files[1].hash);
    }

    #[test]
    fn non_recursive_scan_stays_at_top_level() {
        let temp_dir = TempDir::new().unwrap();
        create_photo(temp_dir.path(), "top.jpg", b"top");

        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        create_photo(&nested, "deep.jpg", b"deep");

        let config = ScanConfig {
            recursive: false,
            ..Default::default()
        };
        let outcome = scanner(config).scan(temp_dir.path(), &null_sender()).unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].path.ends_with("top.jpg"));
    }

    #[test]
    fn recursive_scan_descends() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("2024").join("06");
        fs::create_dir_all(&nested).unwrap();
        create_photo(&nested, "deep.jpg", b"deep");

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
    }

    #[test]
    fn scan_skips_non_photo_files() {
        let temp_dir = TempDir::new().unwrap();
        create_photo(temp_dir.path(), "photo.jpg", b"photo");
        create_photo(temp_dir.path(), "notes.txt", b"not a photo");

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
    }

    #[test]
    fn scan_output_is_path_ordered() {
        let temp_dir = TempDir::new().unwrap();
        create_photo(temp_dir.path(), "zebra.jpg", b"z");
        create_photo(temp_dir.path(), "alpha.jpg", b"a");

        let outcome = scanner(ScanConfig::default())
            .scan(temp_dir.path(), &null_sender())
            .unwrap();

        let names: Vec<_> = outcome
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alpha.jpg", "zebra.jpg"]);
    }

    #[test]
    fn scan_missing_root_is_fatal() {
        let result = scanner(ScanConfig::default())
            .scan(Path::new("/nonexistent/root/12345"), &null_sender());

        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }
}
