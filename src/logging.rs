//! Tracing setup for the usergate binary.
//!
//! `RUST_LOG`, when set, replaces the configured filter entirely. Otherwise
//! the configured level applies to usergate and the HTTP trace layer, while
//! sqlx statement logging is held at `warn`.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Console,
    /// Stdout, plus lines appended to this file.
    ConsoleAndFile(PathBuf),
}

impl LogTarget {
    pub fn from_config(config: &LoggingConfig) -> Self {
        match config.file.as_deref() {
            Some(file) if !file.trim().is_empty() => Self::ConsoleAndFile(PathBuf::from(file)),
            _ => Self::Console,
        }
    }
}

/// Parse log level string to tracing Level. Unknown names fall back to info.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directives for a configured level.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("{level},usergate={level},tower_http={level},sqlx=warn")
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(parse_level(level))))
}

/// Open `path` for appending, creating parent directories as needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber described by `config`.
///
/// Fails if the log file cannot be opened; the caller may then fall back
/// to [`init_console_only`].
pub fn init(config: &LoggingConfig) -> Result<()> {
    let path = match LogTarget::from_config(config) {
        LogTarget::Console => {
            init_console_only(&config.level);
            return Ok(());
        }
        LogTarget::ConsoleAndFile(path) => path,
    };

    let log_file = Arc::new(open_log_file(&path)?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter_for(&config.level))
        .init();

    tracing::debug!(file = %path.display(), "file logging enabled");
    Ok(())
}

/// Install a stdout-only subscriber.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter_for(level))
        .init();
}
