//! Canonical destination resolution
//!
//! Given one photo's extracted metadata, compute the dated directory and
//! the canonical filename it belongs under. Resolution is a pure function
//! of the record and the configuration: no filesystem access, no hidden
//! state, same input resolves to the same target every time.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::PhotoMeta;
use chrono::{Datelike, NaiveDateTime};
use std::path::{Path, PathBuf};

/// One photo travelling through the pipeline
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    /// Full path of the file at its source location
    pub source_path: PathBuf,
    /// Current filename, updated after the .jpeg normalization rename
    pub file_name: String,
    /// Extracted EXIF fields
    pub meta: PhotoMeta,
    /// Timestamp derived from the WhatsApp filename pattern, if any
    pub pattern_time: Option<NaiveDateTime>,
}

impl PhotoRecord {
    pub fn new(source_path: PathBuf, file_name: String) -> Self {
        Self {
            source_path,
            file_name,
            meta: PhotoMeta::default(),
            pattern_time: None,
        }
    }

    /// The timestamp used for naming: DateTimeOriginal over DateTime over
    /// the pattern-derived fallback
    pub fn date_source(&self) -> Option<NaiveDateTime> {
        self.meta.date_source().or(self.pattern_time)
    }
}

/// Computed target location of a photo, immutable once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Year/month partition directory: {target_root}/{YYYY}/{MM}
    pub directory: PathBuf,
    /// Canonical uppercase filename, always starting with the
    /// YYYYMMDD_HHMMSS stamp and ending in .JPG
    pub file_name: String,
}

impl ResolvedTarget {
    /// Directory and filename joined into the full proposed path
    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Resolve the canonical target for a record
///
/// Fails only when the record carries no timestamp source at all; the
/// orchestrator checks that before calling.
pub fn resolve(record: &PhotoRecord, config: &Config) -> Result<ResolvedTarget> {
    let date = record.date_source().ok_or_else(|| Error::NoTimestamp {
        path: record.source_path.clone(),
    })?;

    let mut name = date.format("%Y%m%d_%H%M%S").to_string();

    // Keyword matching is case-sensitive substring containment against the
    // raw original filename, appended in configured order
    for keyword in config.keep_list() {
        if record.file_name.contains(keyword) {
            name.push('_');
            name.push_str(keyword);
        }
    }

    // The model suffix needs both the flag and a non-empty replacement
    // table; see the note on Config::include_camera_model
    if config.include_camera_model
        && let Some(ref model) = record.meta.camera_model
        && !config.model_replacements.is_empty()
    {
        let sanitized = sanitize_model(model, &config.model_replacements);
        name.push_str(&format!("(_{})", sanitized));
    }

    name.push_str(".jpg");

    let directory = partition_dir(config.target_root(), &date);

    Ok(ResolvedTarget {
        directory,
        file_name: name.to_uppercase(),
    })
}

/// Year/month partition under the target root; the directory path keeps
/// its case, only the filename is uppercased
fn partition_dir(target_root: &Path, date: &NaiveDateTime) -> PathBuf {
    target_root
        .join(format!("{}", date.year()))
        .join(format!("{:02}", date.month()))
}

/// Apply the replacement pairs to the model string, in table order
pub fn sanitize_model(model: &str, replacements: &[(String, String)]) -> String {
    let mut sanitized = model.to_string();
    for (from, to) in replacements {
        sanitized = sanitized.replace(from.as_str(), to.as_str());
    }
    sanitized
}
