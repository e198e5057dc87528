//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Photo Filer - file flat photo collections into a dated tree
///
/// Moves JPEG photos from a flat directory into YYYY/MM subfolders,
/// renaming each to a canonical timestamp-based name derived from EXIF
/// data, with a WhatsApp-filename fallback for photos without metadata.
#[derive(Parser, Debug)]
#[command(name = "photo-filer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory where the source photos are stored right now
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Root directory for the dated YYYY/MM tree (defaults to the input
    /// directory, sorting photos in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Add the camera model to the new filename
    #[arg(short = 'c', long)]
    pub camera_model: bool,

    /// Keep "HDR" in the new filename if present in the original
    #[arg(short = 'H', long)]
    pub hdr: bool,

    /// Keep "PORTRAIT" in the new filename if present in the original
    #[arg(short = 'P', long)]
    pub portrait: bool,

    /// Keep "WA" in the new filename if present in the original
    #[arg(short = 'W', long)]
    pub wa: bool,

    /// Keep "BURST" in the new filename if present in the original
    #[arg(short = 'B', long)]
    pub burst: bool,

    /// Keep "COVER" in the new filename if present in the original
    #[arg(short = 'C', long)]
    pub cover: bool,

    /// Keep "TOP" in the new filename if present in the original
    #[arg(short = 'T', long)]
    pub top: bool,

    /// Additional keyword to keep from the original filename (repeatable)
    #[arg(short = 'K', long = "keyword")]
    pub keywords: Vec<String>,

    /// Skip files whose DateTime and DateTimeOriginal tags disagree
    #[arg(long)]
    pub strict: bool,

    /// Do not rename colliding files; record them and leave them in place
    #[arg(long)]
    pub leave_doubles: bool,

    /// Path of the doubles list file
    #[arg(long)]
    pub doubles_file: Option<PathBuf>,

    /// Delete every path recorded in the doubles list, then exit
    #[arg(long)]
    pub purge_doubles: bool,

    /// Write a sample configuration file to the given path, then exit
    #[arg(long)]
    pub write_sample_config: Option<PathBuf>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Keywords selected through the individual opt-in flags, in the
    /// original tool's priority order
    fn flag_keywords(&self) -> Vec<String> {
        let flags = [
            (self.hdr, "HDR"),
            (self.portrait, "PORTRAIT"),
            (self.wa, "WA"),
            (self.burst, "BURST"),
            (self.cover, "COVER"),
            (self.top, "TOP"),
        ];
        flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, kw)| kw.to_string())
            .collect()
    }

    /// Whether any keyword selection flag was given on the command line
    fn selects_keywords(&self) -> bool {
        self.hdr || self.portrait || self.wa || self.burst || self.cover || self.top
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref input) = self.input {
            config.source_dir = input.clone();
        }
        if let Some(ref output) = self.output {
            config.target_dir = Some(output.clone());
        }
        if self.camera_model {
            config.include_camera_model = true;
        }
        if self.selects_keywords() {
            config.keywords = self.flag_keywords();
        }
        if !self.keywords.is_empty() {
            config.extra_keywords = self.keywords.clone();
        }
        if self.strict {
            config.strict_timestamp_match = true;
        }
        if self.leave_doubles {
            config.process_doubles = false;
        }
        if let Some(ref doubles_file) = self.doubles_file {
            config.doubles_file = doubles_file.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();

        if let Some(ref input) = self.input {
            config.source_dir = input.clone();
        }
        config.target_dir = self.output.clone();
        config.include_camera_model = self.camera_model;
        if self.selects_keywords() {
            config.keywords = self.flag_keywords();
        }
        config.extra_keywords = self.keywords.clone();
        config.strict_timestamp_match = self.strict;
        config.process_doubles = !self.leave_doubles;
        if let Some(ref doubles_file) = self.doubles_file {
            config.doubles_file = doubles_file.clone();
        }
        config.dry_run = self.dry_run;
        config.verbose = self.verbose;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_keywords_order() {
        let cli = Cli::parse_from(["photo-filer", "-W", "-C", "-H", "-i", "in"]);
        // Priority order is fixed, not flag order on the command line
        assert_eq!(cli.flag_keywords(), ["HDR", "WA", "COVER"]);
        // -C selects COVER, distinct from the lowercase camera-model flag
        assert!(cli.cover);
        assert!(!cli.camera_model);
    }

    #[test]
    fn test_to_config_defaults_keep_list() {
        let cli = Cli::parse_from(["photo-filer", "-i", "in"]);
        let config = cli.to_config();
        // No selection flags: full default keep-list stays in place
        assert_eq!(config.keywords.len(), 6);
        assert!(!config.include_camera_model);
        assert!(config.process_doubles);
    }

    #[test]
    fn test_merge_overrides() {
        let cli = Cli::parse_from([
            "photo-filer",
            "-i",
            "in",
            "--strict",
            "--leave-doubles",
            "-K",
            "PANO",
        ]);
        let mut base = Config::default();
        base.source_dir = PathBuf::from("old");
        let merged = cli.merge_with_config(base);
        assert_eq!(merged.source_dir, PathBuf::from("in"));
        assert!(merged.strict_timestamp_match);
        assert!(!merged.process_doubles);
        assert_eq!(merged.extra_keywords, ["PANO"]);
        // Camera model flag absent: config file value wins
        assert!(merged.include_camera_model);
    }
}
