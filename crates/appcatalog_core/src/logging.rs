//! Rolling file logs for the catalog core.
//!
//! # Invariants
//! - The backend starts at most once per process; a repeated call with the
//!   same level and directory is a no-op, any other call is rejected.
//! - Setup failures are returned, never panicked.
//! - Log lines carry metadata only. Package names, repository addresses and
//!   credentials stay out of them.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "appcatalog";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_LOG_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: LevelFilter,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Logging bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    /// Log directory must be absolute.
    RelativeLogDir(PathBuf),
    CreateLogDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with another level or directory.
    Conflict {
        active: String,
        requested: String,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => {
                write!(f, "unknown log level `{level}`; use error|warn|info|debug|trace")
            }
            Self::RelativeLogDir(path) => {
                write!(f, "log directory `{}` is not absolute", path.display())
            }
            Self::CreateLogDir { path, source } => {
                write!(f, "cannot create log directory `{}`: {source}", path.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed to start: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs with `{active}`, cannot switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateLogDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::UnsupportedLevel(_) | Self::RelativeLogDir(_) | Self::Conflict { .. } => None,
        }
    }
}

/// Starts file logging at `level` into `log_dir`.
///
/// # Errors
/// - `level` is not one of `error|warn|info|debug|trace`.
/// - `log_dir` is relative or cannot be created.
/// - The backend fails to start, or logging already runs with a different
///   level or directory.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeLogDir(log_dir.to_path_buf()));
    }

    let active = ACTIVE.get_or_try_init(|| start_backend(level, log_dir))?;

    if active.log_dir != log_dir {
        return Err(LoggingError::Conflict {
            active: active.log_dir.display().to_string(),
            requested: log_dir.display().to_string(),
        });
    }
    if active.level != level {
        return Err(LoggingError::Conflict {
            active: active.level.to_string(),
            requested: level.to_string(),
        });
    }
    Ok(())
}

/// Level and directory of the running logger, `None` before
/// [`init_logging`] succeeded.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, LoggingError> {
    match value.trim().parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => {
            Err(LoggingError::UnsupportedLevel(value.trim().to_string()))
        }
        Ok(level) => Ok(level),
    }
}

fn start_backend(level: LevelFilter, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateLogDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEPT_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_logger();
    info!(
        "event=logging_start module=core status=ok level={} os={} debug_build={} version={}",
        level,
        std::env::consts::OS,
        cfg!(debug_assertions),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

// Only reached from inside `ACTIVE` initialization, so it runs once.
fn install_panic_logger() {
    let next = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |at| format!("{}:{}", at.file(), at.line()),
        );
        error!(
            "event=panic module=core status=error location={} payload={}",
            location,
            flatten(panic_text(info), PANIC_PAYLOAD_LIMIT)
        );
        next(info);
    }));
}

fn panic_text<'a>(info: &'a PanicHookInfo<'_>) -> &'a str {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

/// Single-line form of `text`, cut to `limit` characters.
fn flatten(text: &str, limit: usize) -> String {
    let mut line = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(limit)
        .collect::<String>();
    if text.chars().nth(limit).is_some() {
        line.push_str("...");
    }
    line
}
