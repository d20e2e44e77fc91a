//! Logging bootstrap and panic capture.
//!
//! # Responsibility
//! - Initialize the `log` backend exactly once per process.
//! - Route to stderr, or to size-rotated files when a directory is given.
//!
//! # Invariants
//! - Logging init is idempotent for the same level and destination.
//! - Re-initialization with a different level or destination is rejected.
//! - Logging initialization must not panic.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "notes-gateway";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Initializes gateway logging.
///
/// `log_dir = None` logs to stderr; `Some(dir)` writes rolling files there.
///
/// # Errors
/// - `level` is not one of `trace|debug|info|warn|error`.
/// - `log_dir` is empty, relative, or cannot be created.
/// - Logging was already initialized with a different level or destination.
/// - The logger backend fails to start.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), String> {
    let normalized_level = normalize_level(level)?;
    let normalized_dir = log_dir.map(normalize_log_dir).transpose()?;

    if let Some(state) = LOGGING_STATE.get() {
        return check_matches(state, normalized_level, normalized_dir.as_deref());
    }

    let init_dir = normalized_dir.clone();
    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = Logger::try_with_str(normalized_level)
            .map_err(|err| format!("invalid log level `{normalized_level}`: {err}"))?;

        let logger = match init_dir.as_deref() {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|err| {
                    format!("failed to create log directory `{}`: {err}", dir.display())
                })?;
                logger
                    .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                    .rotate(
                        Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                        Naming::Numbers,
                        Cleanup::KeepLogFiles(MAX_LOG_FILES),
                    )
                    .write_mode(WriteMode::BufferAndFlush)
                    .append()
                    .format_for_files(flexi_logger::detailed_format)
            }
            None => logger.log_to_stderr().format(flexi_logger::detailed_format),
        };
        let handle = logger
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        install_panic_hook_once();

        info!(
            "event=gateway_start module=logging status=ok platform={} version={} level={} destination={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION"),
            normalized_level,
            destination_label(init_dir.as_deref())
        );

        Ok(LoggingState {
            level: normalized_level,
            log_dir: init_dir,
            _logger: handle,
        })
    })?;

    check_matches(state, normalized_level, normalized_dir.as_deref())
}

/// Returns `(level, log_dir)` once logging is active.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn check_matches(state: &LoggingState, level: &str, log_dir: Option<&Path>) -> Result<(), String> {
    if state.log_dir.as_deref() != log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            destination_label(state.log_dir.as_deref()),
            destination_label(log_dir)
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

fn destination_label(log_dir: Option<&Path>) -> String {
    match log_dir {
        Some(dir) => dir.display().to_string(),
        None => "stderr".to_string(),
    }
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    if log_dir.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }
    Ok(log_dir.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payload may echo caller input; cap and flatten before logging.
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

pub(crate) fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
