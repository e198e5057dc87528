//! Photo Filer - file flat photo collections into a dated tree
//!
//! A CLI tool that moves JPEG photos into YYYY/MM subfolders, renaming
//! each to a canonical timestamp-based name derived from EXIF data, with
//! a WhatsApp-filename fallback for photos without metadata.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use photo_filer::process::FileOutcome;
use photo_filer::report::REPORT_INTERVAL;
use photo_filer::{Cli, Config, Processor, ReadySignal, StatusReporter, purge_doubles};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Modes that run without the pipeline
    if let Some(ref path) = cli.write_sample_config {
        std::fs::write(path, Config::sample_config())?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Photo Filer starting"
    );

    if cli.purge_doubles {
        return run_purge(&cli);
    }

    let config = load_config(&cli, &exe_dir)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let start_time = Local::now();

    let mut processor = Processor::new(config);
    let ready = Arc::new(ReadySignal::new());
    let reporter = StatusReporter::spawn(
        processor.counters_arc(),
        ready.clone(),
        REPORT_INTERVAL,
    );

    let run = processor.run(&ready);
    reporter.stop();

    match run {
        Ok(results) => {
            let elapsed = Local::now() - start_time;
            let time_str = format!(
                "{} minutes, {} seconds",
                elapsed.num_seconds() / 60,
                elapsed.num_seconds() % 60
            );

            println!("Finished.");
            println!("{}", processor.counters_arc().summary());
            println!("Total time: {}", time_str);
            info!("Finished");
            info!(total_time = %time_str, "Run complete");

            let failed: Vec<_> = results
                .iter()
                .filter(|r| r.outcome == FileOutcome::Failed)
                .collect();
            if !failed.is_empty() {
                eprintln!("{} file(s) failed:", failed.len());
                for result in &failed {
                    eprintln!(
                        "  {}: {}",
                        result.source.display(),
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }

            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Delete every path recorded in the doubles list
fn run_purge(cli: &Cli) -> Result<()> {
    let list_path = cli
        .doubles_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(photo_filer::DOUBLES_FILENAME));

    let stats = purge_doubles(&list_path)?;
    println!(
        "Purged doubles list {}: {} removed, {} already gone, {} failed",
        list_path.display(),
        stats.removed,
        stats.missing,
        stats.failed
    );
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("Run_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source_dir.as_os_str().is_empty() {
        anyhow::bail!("No input directory specified (use -i/--input or a config file)");
    }
    config.validate()?;

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
