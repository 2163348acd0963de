//! Memory-mapped file I/O for hashing large files.
//!
//! Photo collections mix tiny thumbnails with multi-hundred-megabyte
//! RAW files; mapping the large ones avoids copying them through a
//! userspace buffer just to digest them.

use crate::error::HashError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read file bytes, memory-mapping files at or above the threshold.
pub fn read_file_bytes(path: &Path) -> Result<FileBytes, HashError> {
    let metadata = std::fs::metadata(path).map_err(|e| HashError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.len() >= MMAP_THRESHOLD {
        read_mmap(path)
    } else {
        read_standard(path)
    }
}

fn read_mmap(path: &Path) -> Result<FileBytes, HashError> {
    let file = File::open(path).map_err(|e| HashError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    // SAFETY: the file is only read, and the handle lives as long as
    // the mapping.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| HashError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(FileBytes::Mmap(mmap))
}

fn read_standard(path: &Path) -> Result<FileBytes, HashError> {
    let bytes = std::fs::read(path).map_err(|e| HashError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(FileBytes::Vec(bytes))
}

/// File bytes that may be either owned or memory-mapped.
pub enum FileBytes {
    /// Standard heap-allocated bytes
    Vec(Vec<u8>),
    /// Memory-mapped bytes (zero-copy from disk)
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn small_file_reads_into_vec() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("small.jpg");
        fs::write(&path, b"tiny").unwrap();

        let bytes = read_file_bytes(&path).unwrap();
        assert!(matches!(bytes, FileBytes::Vec(_)));
        assert_eq!(bytes.as_ref(), b"tiny");
    }

    #[test]
    fn large_file_is_memory_mapped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.raw");
        fs::write(&path, vec![0xABu8; (MMAP_THRESHOLD + 1) as usize]).unwrap();

        let bytes = read_file_bytes(&path).unwrap();
        assert!(matches!(bytes, FileBytes::Mmap(_)));
        assert_eq!(bytes.as_ref().len(), (MMAP_THRESHOLD + 1) as usize);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let result = read_file_bytes(Path::new("/nonexistent/file.jpg"));
        assert!(result.is_err());
    }
}
