//! Capture-time extraction for naming policies.
//!
//! EXIF `DateTimeOriginal` is the authoritative source; files without
//! usable EXIF fall back to the filesystem modification time.

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Metadata a naming policy may draw on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoMetadata {
    /// When the photo was taken (EXIF), or the file mtime as fallback
    pub capture_time: Option<DateTime<Utc>>,
}

/// Extract metadata from a photo file.
///
/// Never fails: a file that cannot be opened or parsed simply yields
/// empty metadata, and the policy decides whether that is fatal.
pub fn extract_metadata(path: &Path) -> PhotoMetadata {
    PhotoMetadata {
        capture_time: exif_capture_time(path).or_else(|| file_modified_time(path)),
    }
}

fn exif_capture_time(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(&file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref vec) = field.value else {
        return None;
    };
    let bytes = vec.first()?;
    let s = std::str::from_utf8(bytes).ok()?;

    // EXIF date format: "YYYY:MM:DD HH:MM:SS"
    let naive = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn file_modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_empty_metadata() {
        let meta = extract_metadata(Path::new("/nonexistent/photo.jpg"));
        assert!(meta.capture_time.is_none());
    }

    #[test]
    fn exifless_file_falls_back_to_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.jpg");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"no exif here").unwrap();

        let meta = extract_metadata(&path);
        assert!(meta.capture_time.is_some());
    }
}
