//! Logging configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError, TryLockError};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer as fmt_layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::errors::HookError;

/// Verbosity of the hook's own logs. `RUST_LOG` overrides it when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// Append-only log file, written best-effort
    pub log_file: Option<PathBuf>,

    /// Enable JSON format on stdout
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            log_file: Some(PathBuf::from("/var/log/moonbot-webhook.log")),
            json_format: false,
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Guard of the non-blocking file writer. Statics are never dropped, so
/// `flush_logs` must run before the process exits.
static LOG_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Initialize logging. Call `flush_logs` before exiting.
pub fn init_logging(options: LogOptions) -> Result<(), HookError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.as_str()));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if options.stdout {
        if options.json_format {
            layers.push(fmt_layer().json().boxed());
        } else {
            layers.push(fmt_layer().boxed());
        }
    }

    if let Some(path) = options.log_file.as_deref() {
        match open_log_file(path) {
            Ok(appender) => {
                let (writer, file_guard) = tracing_appender::non_blocking(appender);
                layers.push(fmt_layer().with_ansi(false).with_writer(writer).boxed());
                hold_log_guard(file_guard);
            }
            // The subscriber is not installed yet, so this one goes to stderr.
            Err(e) => eprintln!("Log file {} unavailable, logging to stdout only: {e}", path.display()),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| HookError::ConfigError(e.to_string()))
}

fn hold_log_guard(guard: WorkerGuard) {
    let mut slot = LOG_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(guard);
}

/// Write out buffered file logs and close the file writer.
///
/// Never blocks on the guard lock, so it is safe to call from a panic hook.
pub fn flush_logs() {
    let guard = match LOG_GUARD.try_lock() {
        Ok(mut slot) => slot.take(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
        Err(TryLockError::WouldBlock) => None,
    };
    drop(guard);
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, HookError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| HookError::ConfigError(format!("Invalid log file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| HookError::ConfigError(e.to_string()))
}
