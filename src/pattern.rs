//! WhatsApp export filename pattern matching
//!
//! WhatsApp exports carry no EXIF data, but their names embed the date:
//! `IMG-20181108-WA0025.jpg`. The trailing four digits are a per-day export
//! sequence number, not a time of day. The original tool nevertheless folds
//! it into the derived timestamp as `minute = n / 60`, `second = n % 60`,
//! which keeps photos of one day in export order but does not reflect the
//! actual capture time. That quirk is preserved here for compatibility.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Prefix marking a WhatsApp image export
const WHATSAPP_PREFIX: &str = "IMG-";

/// Date segment right after the prefix: IMG-YYYYMMDD...
static DATE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^IMG-(\d{4})(\d{2})(\d{2})").unwrap());

/// Export sequence number at the end of the stem
static SEQUENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})$").unwrap());

/// Outcome of matching a filename against the WhatsApp convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatch {
    /// Name follows the convention; timestamp derived from it
    Derived(NaiveDateTime),
    /// Prefix is present but the name could not be parsed
    Invalid,
    /// Name does not carry the WhatsApp prefix at all
    NotApplicable,
}

impl PatternMatch {
    /// The derived timestamp, if any
    pub fn derived(self) -> Option<NaiveDateTime> {
        match self {
            PatternMatch::Derived(dt) => Some(dt),
            _ => None,
        }
    }
}

/// Derive a timestamp from a WhatsApp-style filename
pub fn match_whatsapp(file_name: &str) -> PatternMatch {
    if !file_name.starts_with(WHATSAPP_PREFIX) {
        return PatternMatch::NotApplicable;
    }

    match parse_whatsapp(file_name) {
        Some(dt) => {
            trace!(file_name, %dt, "Derived timestamp from WhatsApp filename");
            PatternMatch::Derived(dt)
        }
        None => PatternMatch::Invalid,
    }
}

fn parse_whatsapp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let caps = DATE_SEGMENT.captures(stem)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let number: u32 = SEQUENCE.captures(stem)?.get(1)?.as_str().parse().ok()?;

    // Sequence numbers of 3600 and up would need an hour digit; the
    // original rejects them through its minute range check, so do we.
    date.and_hms_opt(0, number / 60, number % 60)
}
