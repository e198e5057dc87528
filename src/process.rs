//! Sequential per-file pipeline
//!
//! Handles the core flow of:
//! - Enumerating the flat source directory
//! - Normalizing .jpeg extensions
//! - Extracting EXIF timestamps with the WhatsApp filename fallback
//! - Resolving each photo's dated target
//! - Collision handling and the actual move
//!
//! Files are processed strictly one at a time, so the doubles list and the
//! existence-check-then-move sequence need no locking.

use crate::config::Config;
use crate::doubles::DoublesLog;
use crate::error::{Error, Result};
use crate::meta;
use crate::naming::{self, PhotoRecord};
use crate::pattern::{self, PatternMatch};
use crate::report::ReadySignal;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Run-scoped counters shared between the worker and the status reporter
///
/// Monotonic, relaxed atomics; the reporter only needs an eventually
/// consistent view for its progress line.
#[derive(Debug, Default)]
pub struct RunCounters {
    /// Files picked up from the source directory
    pub processed: AtomicUsize,
    /// Files moved to a resolved target
    pub moved: AtomicUsize,
    /// Files whose proposed target already existed
    pub double: AtomicUsize,
    /// Files with no EXIF timestamp at all
    pub no_dt: AtomicUsize,
    /// Files rescued by the WhatsApp filename fallback
    pub whatsapp: AtomicUsize,
    /// Files skipped because their two timestamps disagree (strict mode)
    pub dt_mismatch: AtomicUsize,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed: {}, moved: {}, double: {}, no dt: {}, whatsapp: {}, dt_mismatch: {}",
            self.processed.load(Ordering::Relaxed),
            self.moved.load(Ordering::Relaxed),
            self.double.load(Ordering::Relaxed),
            self.no_dt.load(Ordering::Relaxed),
            self.whatsapp.load(Ordering::Relaxed),
            self.dt_mismatch.load(Ordering::Relaxed)
        )
    }
}

/// Terminal state of one file's trip through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Moved to its resolved target; `renamed` when a _COPY[n] suffix was
    /// needed
    Moved { renamed: bool },
    /// No timestamp anywhere, file untouched
    SkippedNoTimestamp,
    /// Strict mode found disagreeing timestamps, file untouched
    SkippedMismatch,
    /// Target occupied and renaming disabled; recorded and left in place
    RecordedDouble,
    /// Dry run - target resolved but nothing touched
    DryRun,
    /// Per-file I/O failure; logged, run continues
    Failed,
}

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source file path
    pub source: PathBuf,
    /// Final destination (if one was decided)
    pub destination: Option<PathBuf>,
    /// Terminal pipeline state
    pub outcome: FileOutcome,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl FileResult {
    fn failed(source: PathBuf, err: &Error) -> Self {
        Self {
            source,
            destination: None,
            outcome: FileOutcome::Failed,
            error: Some(err.to_string()),
        }
    }
}

/// Main processor driving the sequential pipeline
pub struct Processor {
    config: Config,
    doubles: DoublesLog,
    counters: Arc<RunCounters>,
}

impl Processor {
    pub fn new(config: Config) -> Self {
        let doubles = DoublesLog::new(config.doubles_file.clone());
        Self {
            config,
            doubles,
            counters: Arc::new(RunCounters::new()),
        }
    }

    /// Get a clone of the counters Arc for the status reporter
    pub fn counters_arc(&self) -> Arc<RunCounters> {
        self.counters.clone()
    }

    /// Run the pipeline over the full source directory
    ///
    /// `ready` is set once enumeration is complete so the reporter can
    /// switch from its listing notice to the counter line.
    pub fn run(&mut self, ready: &ReadySignal) -> Result<Vec<FileResult>> {
        let _span = span!(Level::INFO, "processor_run").entered();

        info!(source = %self.config.source_dir.display(), "Creating file list, this might take a while");
        let files = self.collect_files()?;
        info!(count = files.len(), "Done creating file list");
        ready.set();

        let mut results = Vec::with_capacity(files.len());
        for path in &files {
            let _file_span = span!(Level::DEBUG, "process_file", path = %path.display()).entered();
            results.push(self.process_single_file(path));
        }

        info!("{}", self.counters.summary());
        Ok(results)
    }

    /// Enumerate photo files directly inside the source directory
    ///
    /// The collection is flat by contract; subdirectories (including any
    /// previously created YYYY partition) are not descended into.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let source = &self.config.source_dir;
        if !source.is_dir() {
            return Err(Error::SourceDirMissing {
                path: source.clone(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(source).min_depth(1).max_depth(1) {
            let entry = entry?;
            let path = entry.path();
            if path.is_file()
                && let Some(ext) = path.extension().and_then(|e| e.to_str())
                && Config::is_photo(ext)
            {
                files.push(path.to_path_buf());
            }
        }

        // Stable order keeps collision suffixes reproducible across runs
        files.sort();
        Ok(files)
    }

    /// Drive one file through the state machine
    fn process_single_file(&self, path: &Path) -> FileResult {
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        debug!(path = %path.display(), "Processing");

        // Physical .jpeg -> .jpg rename comes before everything else
        let (path, file_name) = match self.normalize_extension(path) {
            Ok(normalized) => normalized,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Extension rename failed");
                return FileResult::failed(path.to_path_buf(), &e);
            }
        };

        let mut record = PhotoRecord::new(path.clone(), file_name);
        record.meta = meta::read_photo_meta(&record.source_path);

        if !record.meta.has_timestamp() {
            self.counters.no_dt.fetch_add(1, Ordering::Relaxed);
            match pattern::match_whatsapp(&record.file_name) {
                PatternMatch::Derived(dt) => {
                    self.counters.whatsapp.fetch_add(1, Ordering::Relaxed);
                    record.pattern_time = Some(dt);
                }
                PatternMatch::Invalid | PatternMatch::NotApplicable => {
                    warn!(
                        file = %record.file_name,
                        "No dt(_orig) and not a WhatsApp picture, skipping"
                    );
                    return FileResult {
                        source: record.source_path,
                        destination: None,
                        outcome: FileOutcome::SkippedNoTimestamp,
                        error: None,
                    };
                }
            }
        }

        if self.config.strict_timestamp_match
            && let (Some(taken), Some(taken_original)) =
                (record.meta.taken, record.meta.taken_original)
            && taken != taken_original
        {
            let mismatch = Error::TimestampMismatch {
                path: record.source_path.clone(),
                taken,
                taken_original,
            };
            warn!(file = %record.file_name, "{mismatch}, skipping");
            self.counters.dt_mismatch.fetch_add(1, Ordering::Relaxed);
            return FileResult {
                source: record.source_path,
                destination: None,
                outcome: FileOutcome::SkippedMismatch,
                error: Some(mismatch.to_string()),
            };
        }

        let target = match naming::resolve(&record, &self.config) {
            Ok(target) => target,
            Err(e) => {
                error!(file = %record.file_name, error = %e, "Resolution failed");
                return FileResult::failed(record.source_path, &e);
            }
        };
        let proposed = target.full_path();

        if self.config.dry_run {
            info!(
                source = %record.source_path.display(),
                destination = %proposed.display(),
                "Would move file"
            );
            self.counters.moved.fetch_add(1, Ordering::Relaxed);
            return FileResult {
                source: record.source_path,
                destination: Some(proposed),
                outcome: FileOutcome::DryRun,
                error: None,
            };
        }

        let final_path = match self.doubles.reserve(&proposed, self.config.process_doubles) {
            Ok(Some(path)) => path,
            Ok(None) => {
                info!(
                    file = %record.file_name,
                    target = %proposed.display(),
                    "Double, not processed (renaming disabled)"
                );
                self.counters.double.fetch_add(1, Ordering::Relaxed);
                return FileResult {
                    source: record.source_path,
                    destination: None,
                    outcome: FileOutcome::RecordedDouble,
                    error: None,
                };
            }
            Err(e) => {
                error!(file = %record.file_name, error = %e, "Collision handling failed");
                return FileResult::failed(record.source_path, &e);
            }
        };
        let renamed = final_path != proposed;

        if let Err(e) = move_file(&record.source_path, &final_path) {
            error!(
                source = %record.source_path.display(),
                destination = %final_path.display(),
                error = %e,
                "Move failed"
            );
            return FileResult::failed(record.source_path, &e);
        }

        debug!(
            source = %record.source_path.display(),
            destination = %final_path.display(),
            "Moved file"
        );
        self.counters.moved.fetch_add(1, Ordering::Relaxed);
        if renamed {
            self.counters.double.fetch_add(1, Ordering::Relaxed);
        }

        FileResult {
            source: record.source_path,
            destination: Some(final_path),
            outcome: FileOutcome::Moved { renamed },
            error: None,
        }
    }

    /// Rename a .jpeg file to .jpg in place, before metadata extraction
    ///
    /// Returns the (possibly updated) path and filename. The record only
    /// sees the new name once the physical rename has succeeded.
    fn normalize_extension(&self, path: &Path) -> Result<(PathBuf, String)> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Config(format!("Invalid source filename: {}", path.display())))?
            .to_string();

        if !name.to_lowercase().ends_with(".jpeg") {
            return Ok((path.to_path_buf(), name));
        }

        // The matched suffix is 5 ASCII bytes, slicing is safe
        let new_name = format!("{}.jpg", &name[..name.len() - 5]);
        let new_path = path.with_file_name(&new_name);

        if self.config.dry_run {
            info!(from = %name, to = %new_name, "Would rename");
            return Ok((path.to_path_buf(), name));
        }

        info!(from = %name, to = %new_name, "Renaming");
        fs::rename(path, &new_path)?;
        Ok((new_path, new_name))
    }
}

/// Move a file, creating the target directory tree first
///
/// Rename is tried first; cross-filesystem moves fall back to copy plus
/// delete, preserving the modification time.
fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mtime = fs::metadata(source).and_then(|m| m.modified()).ok();

    if fs::rename(source, dest).is_err() {
        copy_file(source, dest)?;
        fs::remove_file(source)?;

        // Rename keeps the modification time, the copy fallback does not
        if let Some(mtime) = mtime {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
        }
    }

    Ok(())
}

/// Copy file with buffered I/O for efficiency
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::default();
        config.source_dir = dir.to_path_buf();
        config.doubles_file = dir.join("doubles.list");
        config.include_camera_model = false;
        config
    }

    fn run(config: Config) -> (Vec<FileResult>, Arc<RunCounters>) {
        let mut processor = Processor::new(config);
        let counters = processor.counters_arc();
        let ready = ReadySignal::new();
        let results = processor.run(&ready).unwrap();
        assert!(ready.is_set());
        (results, counters)
    }

    #[test]
    fn test_missing_source_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir.path().join("nope"));
        let mut processor = Processor::new(config);
        let ready = ReadySignal::new();
        assert!(matches!(
            processor.run(&ready),
            Err(Error::SourceDirMissing { .. })
        ));
    }

    #[test]
    fn test_enumeration_is_flat_and_photo_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("b.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("2018")).unwrap();
        fs::write(dir.path().join("2018").join("nested.jpg"), b"x").unwrap();

        let processor = Processor::new(config_for(dir.path()));
        let files = processor.collect_files().unwrap();
        assert_eq!(files, vec![dir.path().join("a.jpg")]);
    }

    #[test]
    fn test_whatsapp_file_is_moved_into_partition() {
        let dir = tempdir().unwrap();
        // Junk bytes: no EXIF, so only the filename pattern can date it
        fs::write(dir.path().join("IMG-20181108-WA0025.jpg"), b"junk").unwrap();

        let (results, counters) = run(config_for(dir.path()));
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].outcome,
            FileOutcome::Moved { renamed: false }
        ));

        let expected = dir
            .path()
            .join("2018")
            .join("11")
            .join("20181108_000025_WA.JPG");
        assert!(expected.exists());
        assert_eq!(results[0].destination.as_deref(), Some(expected.as_path()));

        assert_eq!(counters.processed.load(Ordering::Relaxed), 1);
        assert_eq!(counters.moved.load(Ordering::Relaxed), 1);
        // Fallback files count in both no_dt and whatsapp
        assert_eq!(counters.no_dt.load(Ordering::Relaxed), 1);
        assert_eq!(counters.whatsapp.load(Ordering::Relaxed), 1);
        assert_eq!(counters.double.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_undated_file_is_left_alone() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("holiday.jpg");
        fs::write(&source, b"junk").unwrap();

        let (results, counters) = run(config_for(dir.path()));
        assert!(matches!(
            results[0].outcome,
            FileOutcome::SkippedNoTimestamp
        ));
        assert!(source.exists());
        assert_eq!(counters.no_dt.load(Ordering::Relaxed), 1);
        assert_eq!(counters.whatsapp.load(Ordering::Relaxed), 0);
        assert_eq!(counters.moved.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_jpeg_extension_normalized_before_anything_else() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("IMG-20181108-WA0001.JPEG"), b"junk").unwrap();

        let (results, _) = run(config_for(dir.path()));
        assert!(matches!(results[0].outcome, FileOutcome::Moved { .. }));
        // The record saw the renamed .jpg file
        assert_eq!(
            results[0].source,
            dir.path().join("IMG-20181108-WA0001.jpg")
        );
        assert!(
            dir.path()
                .join("2018")
                .join("11")
                .join("20181108_000001_WA.JPG")
                .exists()
        );
    }

    #[test]
    fn test_collision_gets_copy_suffix_and_counts_double() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("IMG-20181108-WA0025.jpg"), b"junk").unwrap();

        let occupied = dir.path().join("2018").join("11");
        fs::create_dir_all(&occupied).unwrap();
        fs::write(occupied.join("20181108_000025_WA.JPG"), b"earlier").unwrap();

        let (results, counters) = run(config_for(dir.path()));
        assert!(matches!(
            results[0].outcome,
            FileOutcome::Moved { renamed: true }
        ));
        assert!(occupied.join("20181108_000025_WA_COPY[1].JPG").exists());
        assert_eq!(counters.moved.load(Ordering::Relaxed), 1);
        assert_eq!(counters.double.load(Ordering::Relaxed), 1);

        let doubles = fs::read_to_string(dir.path().join("doubles.list")).unwrap();
        assert_eq!(doubles.lines().count(), 1);
    }

    #[test]
    fn test_leave_doubles_records_and_keeps_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("IMG-20181108-WA0025.jpg");
        fs::write(&source, b"junk").unwrap();

        let occupied = dir.path().join("2018").join("11");
        fs::create_dir_all(&occupied).unwrap();
        fs::write(occupied.join("20181108_000025_WA.JPG"), b"earlier").unwrap();

        let mut config = config_for(dir.path());
        config.process_doubles = false;

        let (results, counters) = run(config);
        assert!(matches!(results[0].outcome, FileOutcome::RecordedDouble));
        assert!(source.exists());
        assert_eq!(counters.double.load(Ordering::Relaxed), 1);
        assert_eq!(counters.moved.load(Ordering::Relaxed), 0);
        assert!(dir.path().join("doubles.list").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("IMG-20181108-WA0025.jpg");
        fs::write(&source, b"junk").unwrap();

        let mut config = config_for(dir.path());
        config.dry_run = true;

        let (results, counters) = run(config);
        assert!(matches!(results[0].outcome, FileOutcome::DryRun));
        assert!(source.exists());
        assert!(!dir.path().join("2018").exists());
        assert!(!dir.path().join("doubles.list").exists());
        assert_eq!(counters.moved.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_separate_target_root() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        fs::write(source.path().join("IMG-20200501-WA0002.jpg"), b"junk").unwrap();

        let mut config = config_for(source.path());
        config.target_dir = Some(target.path().to_path_buf());

        let (results, _) = run(config);
        assert!(matches!(results[0].outcome, FileOutcome::Moved { .. }));
        assert!(
            target
                .path()
                .join("2020")
                .join("05")
                .join("20200501_000002_WA.JPG")
                .exists()
        );
    }

    /// Minimal little-endian TIFF with DateTime in IFD0 and
    /// DateTimeOriginal in the Exif sub-IFD. kamadak-exif sniffs the
    /// container by content, so the .jpg extension is irrelevant.
    fn exif_bytes(taken: &str, taken_original: &str) -> Vec<u8> {
        assert_eq!(taken.len(), 19);
        assert_eq!(taken_original.len(), 19);

        fn entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: u32) {
            buf.extend(tag.to_le_bytes());
            buf.extend(typ.to_le_bytes());
            buf.extend(count.to_le_bytes());
            buf.extend(value.to_le_bytes());
        }

        let mut b = Vec::new();
        b.extend(b"II");
        b.extend(42u16.to_le_bytes());
        b.extend(8u32.to_le_bytes());
        // IFD0: DateTime + pointer to the Exif IFD at offset 38
        b.extend(2u16.to_le_bytes());
        entry(&mut b, 0x0132, 2, 20, 56);
        entry(&mut b, 0x8769, 4, 1, 38);
        b.extend(0u32.to_le_bytes());
        // Exif IFD: DateTimeOriginal
        b.extend(1u16.to_le_bytes());
        entry(&mut b, 0x9003, 2, 20, 76);
        b.extend(0u32.to_le_bytes());
        // ASCII values at offsets 56 and 76
        b.extend(taken.as_bytes());
        b.push(0);
        b.extend(taken_original.as_bytes());
        b.push(0);
        b
    }

    #[test]
    fn test_original_timestamp_wins_over_datetime() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("shot.jpg"),
            exif_bytes("2020:01:01 10:00:00", "2020:01:02 10:00:00"),
        )
        .unwrap();

        let (results, counters) = run(config_for(dir.path()));
        assert!(matches!(results[0].outcome, FileOutcome::Moved { .. }));
        assert!(
            dir.path()
                .join("2020")
                .join("01")
                .join("20200102_100000.JPG")
                .exists()
        );
        assert_eq!(counters.no_dt.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_strict_mode_skips_disagreeing_timestamps() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("shot.jpg");
        fs::write(
            &source,
            exif_bytes("2020:01:01 10:00:00", "2020:01:02 10:00:00"),
        )
        .unwrap();

        let mut config = config_for(dir.path());
        config.strict_timestamp_match = true;

        let (results, counters) = run(config);
        assert!(matches!(results[0].outcome, FileOutcome::SkippedMismatch));
        assert!(source.exists());
        assert_eq!(counters.dt_mismatch.load(Ordering::Relaxed), 1);
        assert_eq!(counters.moved.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_strict_mode_accepts_matching_timestamps() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("shot.jpg"),
            exif_bytes("2020:01:02 10:00:00", "2020:01:02 10:00:00"),
        )
        .unwrap();

        let mut config = config_for(dir.path());
        config.strict_timestamp_match = true;

        let (results, counters) = run(config);
        assert!(matches!(results[0].outcome, FileOutcome::Moved { .. }));
        assert_eq!(counters.dt_mismatch.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_counters_summary_wording() {
        let counters = RunCounters::new();
        counters.processed.fetch_add(3, Ordering::Relaxed);
        counters.moved.fetch_add(2, Ordering::Relaxed);
        counters.no_dt.fetch_add(1, Ordering::Relaxed);
        assert_eq!(
            counters.summary(),
            "Processed: 3, moved: 2, double: 0, no dt: 1, whatsapp: 0, dt_mismatch: 0"
        );
    }
}
