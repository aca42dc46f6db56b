//! Subscriber setup plus the request-scoped pieces of logging.

mod context;
mod db_sink;
mod middleware;

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::Config;

pub use context::{REQUEST_ID_HEADER, RequestContext};
pub use db_sink::{DbLogLayer, LogEntryReceiver, spawn_writer};
pub use middleware::track_request;

/// Install the global subscriber described by `config`.
///
/// Console output is always on. When `log_to_db` is set the returned receiver
/// must be handed to [`spawn_writer`] once a store is available; entries
/// logged before that wait in the channel.
pub fn init(config: &Config) -> Result<Option<LogEntryReceiver>> {
    let console = fmt::layer().with_filter(env_filter(&config.log_level)?);

    let file = if config.log_to_file {
        let file = open_log_file(Path::new(&config.log_file_path))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(env_filter(&config.log_level)?),
        )
    } else {
        None
    };

    let (db, receiver) = if config.log_to_db {
        let level = parse_level(&config.log_db_level)?;
        let (layer, rx) = DbLogLayer::new();
        (Some(layer.with_filter(LevelFilter::from_level(level))), Some(rx))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(db)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(receiver)
}

fn env_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("invalid LOG_LEVEL {directive:?}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

/// Accepts tracing level names plus the `warning`/`critical` spellings.
pub fn parse_level(name: &str) -> Result<Level> {
    let name = name.trim().to_ascii_lowercase();
    let name = match name.as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        other => other,
    };
    name.parse::<Level>()
        .map_err(|_| anyhow::anyhow!("invalid log level {name:?}"))
}
