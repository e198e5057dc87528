//! Photo Filer - a CLI tool for filing flat photo collections
//!
//! This library provides functionality for moving JPEG photos from a flat
//! directory into a dated YYYY/MM tree with support for:
//! - EXIF timestamp and camera model extraction
//! - WhatsApp filename fallback for photos without metadata
//! - Canonical timestamp-based renaming with keyword keep-lists
//! - Collision handling backed by an append-only doubles list
//! - A periodic progress reporter running beside the worker

pub mod cli;
pub mod config;
pub mod doubles;
pub mod error;
pub mod meta;
pub mod naming;
pub mod pattern;
pub mod process;
pub mod report;

pub use cli::Cli;
pub use config::{Config, ConfigError, DOUBLES_FILENAME};
pub use doubles::{DoublesLog, PurgeStats, purge_doubles};
pub use error::{Error, Result};
pub use meta::PhotoMeta;
pub use naming::{PhotoRecord, ResolvedTarget};
pub use pattern::PatternMatch;
pub use process::{FileOutcome, FileResult, Processor, RunCounters};
pub use report::{ReadySignal, StatusReporter};
