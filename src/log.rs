//! Logging setup with file output.
//!
//! The terminal belongs to the editor, so logs only ever go to a file.
//!
//! ## Environment Variables
//!
//! 1. **`CORDAGE_LOG`** (highest priority) - cordage-specific logging control.
//!    A bare level such as `debug` applies to the cordage crate only.
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for cordage
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/cordage/logs/cordage-<pid>.log`
//! - macOS: `~/Library/Application Support/cordage/logs/cordage-12345.log`
//! - Linux: `~/.local/share/cordage/logs/cordage-12345.log`
//!
//! Override with `--log-file <path>`. A path with an extension names the file,
//! anything else names the directory.

use std::env;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const DEFAULT_FILTER: &str = "warn,cordage=info";

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

/// Initialize logging.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program.
/// Dropping it flushes and stops the background file writer.
pub fn init(log_file: Option<PathBuf>) -> Result<LogGuard, InitError> {
    let (log_dir, filename) = resolve_log_path(log_file);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_filter());

    Registry::default().with(file_layer).try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Writes to the test harness's captured stdout. Will not crash if called
/// multiple times or if another test already initialized logging.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("cordage-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cordage")
        .join("logs");
    (dir, filename)
}

/// Implements the priority system: `CORDAGE_LOG` > `RUST_LOG` > defaults.
fn create_filter() -> EnvFilter {
    if let Ok(cordage_log) = env::var("CORDAGE_LOG") {
        return expand_cordage_log(&cordage_log);
    }
    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }
    EnvFilter::new(DEFAULT_FILTER)
}

/// Simple levels (`CORDAGE_LOG=debug`) expand to `warn,cordage=debug`;
/// anything with a `=` or `,` is passed through as a full filter.
fn expand_cordage_log(value: &str) -> EnvFilter {
    EnvFilter::new(expand_directives(value))
}

fn expand_directives(value: &str) -> String {
    let value = value.trim();
    if value.contains('=') || value.contains(',') {
        value.to_string()
    } else {
        format!("warn,cordage={value}")
    }
}
