//! File logging for hosts embedding the store.
//!
//! Storage events (`storage_write`, `db_migrate`, `repo_persist`, ...) go
//! through the `log` facade; this module routes them to rolling files under
//! one absolute directory. Warnings and errors are also echoed to stderr.
//!
//! # Invariants
//! - Logging is set up at most once per process.
//! - Repeating the active level and directory is a no-op; anything else is
//!   rejected with `LogError::AlreadyInitialized`.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, LogSpecification, Logger,
    LoggerHandle, Naming, WriteMode,
};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "classdesk-store";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LogError {
    RelativeDir(PathBuf),
    AlreadyInitialized { level: LevelFilter, dir: PathBuf },
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(FlexiLoggerError),
}

impl Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::AlreadyInitialized { level, dir } => write!(
                f,
                "logging already active at level {level} in `{}`",
                dir.display()
            ),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger failed to start: {err}"),
        }
    }
}

impl Error for LogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::RelativeDir(_) | Self::AlreadyInitialized { .. } => None,
        }
    }
}

/// Starts rolling file logs at `level` inside `log_dir`.
pub fn init_logging(level: LevelFilter, log_dir: &Path) -> Result<(), LogError> {
    if !log_dir.is_absolute() {
        return Err(LogError::RelativeDir(log_dir.to_path_buf()));
    }

    let active = ACTIVE.get_or_try_init(|| start_logger(level, log_dir))?;
    if active.level != level || active.dir != log_dir {
        return Err(LogError::AlreadyInitialized {
            level: active.level,
            dir: active.dir.clone(),
        });
    }
    Ok(())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn start_logger(level: LevelFilter, dir: &Path) -> Result<ActiveLogger, LogError> {
    std::fs::create_dir_all(dir).map_err(|source| LogError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let spec = LogSpecification::builder().default(level).build();
    let handle = Logger::with(spec)
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LogError::Backend)?;

    info!(
        "event=logging_init module=storage status=ok version={} level={level} dir={}",
        env!("CARGO_PKG_VERSION"),
        dir.display()
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

#[cfg(test)]
mod tests {
    use super::{init_logging, LogError};
    use log::LevelFilter;
    use std::path::Path;

    #[test]
    fn relative_dir_is_rejected_before_setup() {
        let err = init_logging(LevelFilter::Info, Path::new("logs/dev")).unwrap_err();
        assert!(matches!(err, LogError::RelativeDir(_)));
    }

    #[test]
    fn repeat_init_is_noop_and_conflicts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();

        init_logging(LevelFilter::Info, dir.path()).unwrap();
        init_logging(LevelFilter::Info, dir.path()).unwrap();

        let err = init_logging(LevelFilter::Debug, dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LogError::AlreadyInitialized { level: LevelFilter::Info, .. }
        ));
        let err = init_logging(LevelFilter::Info, other.path()).unwrap_err();
        assert!(err.to_string().contains("already active"));
    }
}
