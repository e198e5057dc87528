//! EXIF metadata extraction for photos
//!
//! Every field is optional: an unreadable container or a missing tag yields
//! an absent value, never an error. Only the orchestrator decides whether
//! the absence of both timestamps makes a file unprocessable.

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, trace};

/// Optional EXIF fields of a single photo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMeta {
    /// DateTime tag (file modification date/time)
    pub taken: Option<NaiveDateTime>,
    /// DateTimeOriginal tag, usually the more authoritative capture time
    pub taken_original: Option<NaiveDateTime>,
    /// Camera model string
    pub camera_model: Option<String>,
}

impl PhotoMeta {
    /// True iff at least one usable timestamp was obtained
    pub fn has_timestamp(&self) -> bool {
        self.taken.is_some() || self.taken_original.is_some()
    }

    /// The timestamp used for naming: DateTimeOriginal wins over DateTime
    pub fn date_source(&self) -> Option<NaiveDateTime> {
        self.taken_original.or(self.taken)
    }
}

/// Read the optional EXIF fields of a photo
///
/// Missing fields are reported at info level, listing exactly which of
/// dt, dt_orig and model could not be read.
pub fn read_photo_meta(path: &Path) -> PhotoMeta {
    let meta = extract_fields(path).unwrap_or_default();

    if meta.taken.is_none() || meta.taken_original.is_none() || meta.camera_model.is_none() {
        let mut issues = Vec::new();
        if meta.taken.is_none() {
            issues.push("dt");
        }
        if meta.taken_original.is_none() {
            issues.push("dt_orig");
        }
        if meta.camera_model.is_none() {
            issues.push("model");
        }
        info!(
            ?path,
            missing = issues.join(","),
            "Could not get all EXIF fields"
        );
    }

    meta
}

/// Extract the three fields from the EXIF container, if it can be read
fn extract_fields(path: &Path) -> Option<PhotoMeta> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    let taken = exif
        .get_field(Tag::DateTime, In::PRIMARY)
        .and_then(|f| parse_exif_datetime(&f.display_value().to_string()));
    let taken_original = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|f| parse_exif_datetime(&f.display_value().to_string()));
    let camera_model = exif
        .get_field(Tag::Model, In::PRIMARY)
        .map(|f| f.display_value().to_string().trim_matches('"').to_string())
        .filter(|s| !s.is_empty());

    trace!(?path, ?taken, ?taken_original, ?camera_model, "Read EXIF fields");

    Some(PhotoMeta {
        taken,
        taken_original,
        camera_model,
    })
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // EXIF format: "2024:01:15 14:30:00" or with quotes
    let s = s.trim().trim_matches('"');

    // Try standard EXIF format
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    // Try with subseconds
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%.f") {
        return Some(dt);
    }

    // Try alternative formats
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    None
}
