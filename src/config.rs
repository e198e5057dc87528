//! Configuration types for the photo filer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the append-only collision record.
///
/// One literal path per line; consumed verbatim by the purge utility.
pub const DOUBLES_FILENAME: &str = "doubles.list";

/// Keywords kept from the original filename by default, in priority order
pub const DEFAULT_KEYWORDS: &[&str] = &["HDR", "PORTRAIT", "WA", "BURST", "COVER", "TOP"];

/// Configuration for the photo filer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the flat photo collection to file away
    pub source_dir: PathBuf,

    /// Root of the dated YYYY/MM tree. Defaults to the source directory,
    /// matching the original tool's behavior of sorting in place.
    #[serde(default)]
    pub target_dir: Option<PathBuf>,

    /// Append the sanitized camera model to the filename.
    ///
    /// The suffix is only appended when `model_replacements` is non-empty;
    /// with an empty table the model is dropped even when this is set.
    pub include_camera_model: bool,

    /// Keywords copied from the original filename into the new one,
    /// appended in this order (not alphabetical)
    pub keywords: Vec<String>,

    /// User-supplied keywords, appended after the built-in list
    #[serde(default)]
    pub extra_keywords: Vec<String>,

    /// Rename colliding targets with a _COPY[n] suffix. When false a
    /// colliding file is recorded and left untouched at its source.
    pub process_doubles: bool,

    /// Skip files whose DateTime and DateTimeOriginal tags disagree
    pub strict_timestamp_match: bool,

    /// Substring replacement pairs applied to the camera model, in order
    pub model_replacements: Vec<(String, String)>,

    /// Path of the doubles list file
    #[serde(default = "default_doubles_file")]
    pub doubles_file: PathBuf,

    /// Dry run mode - resolve and report without touching any file
    #[serde(default)]
    pub dry_run: bool,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

fn default_doubles_file() -> PathBuf {
    PathBuf::from(DOUBLES_FILENAME)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            target_dir: None,
            include_camera_model: true,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            extra_keywords: vec![],
            process_doubles: true,
            strict_timestamp_match: false,
            model_replacements: vec![
                ("_".into(), "-".into()),
                ("(".into(), "".into()),
                (")".into(), "".into()),
                (" ".into(), "-".into()),
            ],
            doubles_file: default_doubles_file(),
            dry_run: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Root directory of the produced YYYY/MM tree
    pub fn target_root(&self) -> &Path {
        self.target_dir.as_deref().unwrap_or(&self.source_dir)
    }

    /// Built-in and user keywords in configured priority order
    pub fn keep_list(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .chain(self.extra_keywords.iter())
            .map(String::as_str)
    }

    /// Check if a file extension names a photo this tool handles
    pub fn is_photo(ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        ext_lower == "jpg" || ext_lower == "jpeg"
    }

    /// Reject a target tree rooted inside the source directory
    ///
    /// An explicit target strictly below the source would make the run feed
    /// on its own output. Equal paths stay allowed: sorting in place is the
    /// default, and enumeration is flat so the dated subfolders are never
    /// picked up again.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref target) = self.target_dir
            && target != &self.source_dir
            && target.starts_with(&self.source_dir)
        {
            return Err(ConfigError::TargetInsideSource {
                target: target.clone(),
                source: self.source_dir.clone(),
            });
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Filer Configuration File
# This file uses TOML format (https://toml.io)

# Directory holding the flat photo collection
source_dir = "D:/Camera"

# Root of the dated YYYY/MM tree.
# When omitted, photos are filed into subfolders of source_dir.
target_dir = "D:/Sorted"

# Append the sanitized camera model to the filename, e.g.
# 20181108_143000(_MOTO-G8-PLUS).JPG
include_camera_model = true

# Keywords copied from the original filename, in priority order
keywords = ["HDR", "PORTRAIT", "WA", "BURST", "COVER", "TOP"]

# Additional keywords to keep
extra_keywords = []

# Rename colliding targets with a _COPY[n] suffix.
# When false, colliding files are recorded in the doubles list and
# left untouched at their source.
process_doubles = true

# Skip files whose DateTime and DateTimeOriginal EXIF tags disagree
strict_timestamp_match = false

# Substring replacements applied to the camera model, in order
model_replacements = [["_", "-"], ["(", ""], [")", ""], [" ", "-"]]

# Path of the append-only doubles list
doubles_file = "doubles.list"

# Dry run mode - show what would be done without actually doing it
dry_run = false

# Verbose output - show detailed processing information
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Target tree rooted strictly inside the source directory
    TargetInsideSource { target: PathBuf, source: PathBuf },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::TargetInsideSource { target, source } => {
                write!(
                    f,
                    "Target directory '{}' is inside source directory '{}'",
                    target.display(),
                    source.display()
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::TargetInsideSource { .. } => None,
        }
    }
}
