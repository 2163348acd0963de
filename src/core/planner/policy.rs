//! Naming policies: pure functions from a record and its metadata to a
//! proposed path.

use super::metadata::PhotoMetadata;
use crate::core::catalog::PhotoRecord;
use crate::error::PolicyError;
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Trait for rename target computation.
///
/// Implementations must be pure: the same record and metadata always
/// yield the same proposal, so a dry run previews exactly what a real
/// run would do.
pub trait NamingPolicy: Send + Sync {
    fn propose(
        &self,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<PathBuf, PolicyError>;
}

/// Optional year/month subdirectory splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirs {
    /// base/2024/name.jpg
    Year,
    /// base/2024/Jun/name.jpg
    Month,
}

/// Configuration for [`TemplatePolicy`]
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    /// Filename template with `{tag}` placeholders; None keeps the old name.
    ///
    /// Supported tags: `{timestamp}`, `{year}`, `{month}`, `{isoyear}`,
    /// `{isoweek}`, `{isoday}`, `{old_name}`, `{hash}`, `{regex}`.
    pub template: Option<String>,
    /// strftime format for the `{timestamp}` tag
    pub date_format: Option<String>,
    /// Regex run against the old path to feed the `{regex}` tag
    pub pattern: Option<String>,
    /// Expansion string for the pattern's capture groups ($1, $2, ...);
    /// without it, captures join with underscores
    pub expand: Option<String>,
    /// Replace whitespace in the proposed relative path
    pub whitespace: Option<String>,
    /// Keep only the first N components of the relative directory
    pub level: Option<usize>,
    /// Subdivide the target directory by capture year/month
    pub split_dirs: Option<SplitDirs>,
    /// New base directory to restructure under
    pub new_base: Option<PathBuf>,
    /// Base the stored paths currently live under; needed to preserve
    /// relative directory structure when moving to a new base
    pub old_base: Option<PathBuf>,
}

/// Template-driven naming policy
pub struct TemplatePolicy {
    config: TemplateConfig,
    date_format: String,
    pattern: Option<Regex>,
    tag_re: Regex,
}

const DEFAULT_DATE_FORMAT: &str = "%Y%m%d_%H%M%S";

impl TemplatePolicy {
    pub fn new(config: TemplateConfig) -> Result<Self, PolicyError> {
        let pattern = match &config.pattern {
            Some(p) => Some(
                Regex::new(p).map_err(|e| PolicyError::InvalidTemplate(e.to_string()))?,
            ),
            None => None,
        };

        let tag_re = Regex::new(r"\{([a-z_0-9]+)\}")
            .map_err(|e| PolicyError::InvalidTemplate(e.to_string()))?;

        let date_format = config
            .date_format
            .clone()
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

        Ok(Self {
            config,
            date_format,
            pattern,
            tag_re,
        })
    }

    fn capture_time(
        &self,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<DateTime<Utc>, PolicyError> {
        metadata
            .capture_time
            .ok_or_else(|| PolicyError::MissingTimestamp {
                path: record.path.clone(),
            })
    }

    fn regex_value(&self, record: &PhotoRecord) -> Result<String, PolicyError> {
        let pattern = self.pattern.as_ref().ok_or_else(|| {
            PolicyError::InvalidTemplate(
                "{regex} tag requires a match pattern".to_string(),
            )
        })?;

        let path_str = record.path.to_string_lossy();
        let captures =
            pattern
                .captures(&path_str)
                .ok_or_else(|| PolicyError::NoRegexMatch {
                    pattern: pattern.as_str().to_string(),
                    path: record.path.clone(),
                })?;

        match &self.config.expand {
            Some(expand) => {
                let mut out = String::new();
                captures.expand(expand, &mut out);
                Ok(out)
            }
            None => Ok(captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join("_")),
        }
    }

    fn tag_value(
        &self,
        tag: &str,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<String, PolicyError> {
        match tag {
            "timestamp" => Ok(self
                .capture_time(record, metadata)?
                .format(&self.date_format)
                .to_string()),
            "year" => Ok(self.capture_time(record, metadata)?.year().to_string()),
            "month" => Ok(format!("{:02}", self.capture_time(record, metadata)?.month())),
            "isoyear" => Ok(self
                .capture_time(record, metadata)?
                .iso_week()
                .year()
                .to_string()),
            "isoweek" => Ok(format!(
                "{:02}",
                self.capture_time(record, metadata)?.iso_week().week()
            )),
            "isoday" => Ok(self
                .capture_time(record, metadata)?
                .weekday()
                .number_from_monday()
                .to_string()),
            "old_name" => Ok(record
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()),
            "hash" => Ok(record.content_hash.as_str().to_string()),
            "regex" => self.regex_value(record),
            other => Err(PolicyError::UnknownTag {
                tag: other.to_string(),
            }),
        }
    }

    fn expand_template(
        &self,
        template: &str,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<String, PolicyError> {
        let mut out = String::new();
        let mut last = 0;
        for caps in self.tag_re.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 always present");
            out.push_str(&template[last..whole.start()]);
            out.push_str(&self.tag_value(&caps[1], record, metadata)?);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    /// New filename; keeps the old extension unless the template carries one
    fn file_name(
        &self,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<String, PolicyError> {
        let old_name = record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(template) = &self.config.template else {
            return Ok(old_name);
        };

        let mut name = self.expand_template(template, record, metadata)?;

        if Path::new(template).extension().is_none() {
            if let Some(ext) = record.path.extension() {
                name.push('.');
                name.push_str(&ext.to_string_lossy());
            }
        }

        Ok(name)
    }

    /// Target directory after restructuring options
    fn directory(
        &self,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<PathBuf, PolicyError> {
        let parent = record.path.parent().unwrap_or_else(|| Path::new(""));

        // Relative structure is only known when an old base is given
        let rel_dir: PathBuf = match &self.config.old_base {
            Some(base) => parent.strip_prefix(base).unwrap_or(parent).to_path_buf(),
            None => PathBuf::new(),
        };

        let rel_dir: PathBuf = match self.config.level {
            Some(level) => rel_dir
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .take(level)
                .collect(),
            None => rel_dir,
        };

        let mut dir = match (&self.config.new_base, &self.config.old_base) {
            (Some(new_base), _) => new_base.join(rel_dir),
            (None, Some(old_base)) => old_base.join(rel_dir),
            (None, None) => parent.to_path_buf(),
        };

        if let Some(split) = self.config.split_dirs {
            let dt = self.capture_time(record, metadata)?;
            match split {
                SplitDirs::Year => dir.push(dt.format("%Y").to_string()),
                SplitDirs::Month => {
                    dir.push(dt.format("%Y").to_string());
                    dir.push(dt.format("%b").to_string());
                }
            }
        }

        Ok(dir)
    }
}

impl NamingPolicy for TemplatePolicy {
    fn propose(
        &self,
        record: &PhotoRecord,
        metadata: &PhotoMetadata,
    ) -> Result<PathBuf, PolicyError> {
        let name = self.file_name(record, metadata)?;
        let dir = self.directory(record, metadata)?;
        let mut proposed = dir.join(name);

        if let Some(replacement) = &self.config.whitespace {
            let squeezed = proposed
                .to_string_lossy()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(replacement);
            proposed = PathBuf::from(squeezed);
        }

        Ok(proposed)
    }
}
