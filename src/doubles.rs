//! Collision handling and the doubles list
//!
//! Every naming collision ever encountered is appended to the doubles list,
//! one literal path per line, whether or not a rename rescues the file. The
//! list is the audit trail consumed by the purge utility, which treats each
//! line as a deletable duplicate path.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Upper bound of the _COPY[n] suffix search
pub const MAX_COPY_SUFFIX: u32 = 10_000;

/// Append-only record of colliding target paths
#[derive(Debug, Clone)]
pub struct DoublesLog {
    path: PathBuf,
}

impl DoublesLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserve a final path for a proposed target
    ///
    /// Returns the proposal unchanged when nothing sits there yet. An
    /// existing target is recorded in the doubles list first; then, with
    /// `allow_rename`, the first free `_COPY[n]` variant is returned, and
    /// without it `None` signals the caller to leave the file at its
    /// source.
    pub fn reserve(&self, proposed: &Path, allow_rename: bool) -> Result<Option<PathBuf>> {
        if !proposed.exists() {
            return Ok(Some(proposed.to_path_buf()));
        }

        self.append(proposed)?;

        if !allow_rename {
            return Ok(None);
        }

        let (stem, ext) = split_name(proposed)?;
        let parent = proposed.parent().map(Path::to_path_buf).unwrap_or_default();

        for n in 1..=MAX_COPY_SUFFIX {
            let candidate = parent.join(format!("{}_COPY[{}]{}", stem, n, ext));
            if !candidate.exists() {
                info!(double = %candidate.display(), "Double filename");
                return Ok(Some(candidate));
            }
        }

        Err(Error::CollisionUnresolved {
            path: proposed.to_path_buf(),
        })
    }

    /// Append one path to the doubles list, creating the file if absent
    fn append(&self, colliding: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::DoublesList {
                path: self.path.clone(),
                source: e,
            })?;

        writeln!(file, "{}", colliding.display()).map_err(|e| Error::DoublesList {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

fn split_name(path: &Path) -> Result<(String, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Config(format!("Invalid target filename: {}", path.display())))?;

    match name.rsplit_once('.') {
        Some((stem, ext)) => Ok((stem.to_string(), format!(".{}", ext))),
        None => Ok((name.to_string(), String::new())),
    }
}

/// Outcome of a doubles list purge
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    /// Paths deleted
    pub removed: usize,
    /// Paths that no longer existed
    pub missing: usize,
    /// Paths that could not be deleted
    pub failed: usize,
}

/// Delete every path recorded in the doubles list
///
/// Lines are taken literally, no escaping. Already-gone paths are fine;
/// other deletion failures are logged and counted, never fatal. The list
/// file itself is left in place.
pub fn purge_doubles(list_path: &Path) -> Result<PurgeStats> {
    let content = fs::read_to_string(list_path)?;
    let mut stats = PurgeStats::default();

    for line in content.lines() {
        let path = line.trim();
        if path.is_empty() {
            continue;
        }

        match fs::remove_file(path) {
            Ok(()) => stats.removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => stats.missing += 1,
            Err(e) => {
                warn!(path, error = %e, "Could not delete recorded double");
                stats.failed += 1;
            }
        }
    }

    info!(
        removed = stats.removed,
        missing = stats.missing,
        failed = stats.failed,
        "Purged doubles list"
    );

    Ok(stats)
}
