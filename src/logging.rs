//! Tracing setup for the `popgrowth-*` binaries.
//!
//! Each run logs to stdout and to its own file under the application logs
//! directory. Run files are named by start time, so lexical order is
//! chronological and pruning keeps the newest [`MAX_RUN_LOGS`]. The library
//! only emits events; it never installs a subscriber.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Run logs kept after pruning.
pub const MAX_RUN_LOGS: usize = 10;
/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "popgrowth=info";
const RUN_LOG_PREFIX: &str = "popgrowth_";
const RUN_LOG_SUFFIX: &str = "log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to prepare log directory: {0}")]
    LogDir(#[from] app_dirs::AppDirError),
    #[error("Failed to name run log: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Failed to open run log in {dir}: {source}")]
    OpenRunLog { dir: PathBuf, source: InitError },
    #[error("Failed to prune run logs in {dir}: {source}")]
    Prune {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the stdout + run-file subscriber. Later calls are no-ops.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Errors are returned so a binary
/// can carry on with stderr output only.
pub fn init() -> Result<(), LoggingError> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }
    let dir = app_dirs::logs_dir()?;
    let started = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(run_log_stem(started)?)
        .filename_suffix(RUN_LOG_SUFFIX)
        .build(&dir)
        .map_err(|source| LoggingError::OpenRunLog {
            dir: dir.clone(),
            source,
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let removed = prune_run_logs(&dir, MAX_RUN_LOGS)?;

    const CLOCK: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(offset, CLOCK);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing::subscriber::set_global_default(
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(timer.clone())
                    .with_writer(std::io::stdout),
            )
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_timer(timer)
                    .with_writer(file_writer),
            ),
    )?;
    let _ = FILE_GUARD.set(guard);
    tracing::debug!(dir = %dir.display(), removed, "Run logging ready");
    Ok(())
}

/// File name without extension for a run started at `started`.
fn run_log_stem(started: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!("{RUN_LOG_PREFIX}{}", started.format(STAMP)?))
}

/// Delete the oldest run logs in `dir` so at most `keep` remain. Returns the
/// number removed. Files not named like run logs are left alone.
fn prune_run_logs(dir: &Path, keep: usize) -> Result<usize, LoggingError> {
    let prune_error = |source| LoggingError::Prune {
        dir: dir.to_path_buf(),
        source,
    };
    let mut runs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(prune_error)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(RUN_LOG_SUFFIX)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(RUN_LOG_PREFIX))
        })
        .collect();
    runs.sort();
    let excess = runs.len().saturating_sub(keep);
    for path in &runs[..excess] {
        fs::remove_file(path).map_err(prune_error)?;
    }
    Ok(excess)
}
