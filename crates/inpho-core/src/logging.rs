//! Structured logging schema and subscriber setup.
//!
//! All crates use the field names below for structured logging so that a
//! mining run can be followed across scanning, mining and publishing.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run aborted, requires operator attention |
//! | WARN  | Recoverable issue, item skipped (bad pattern, missing article) |
//! | INFO  | Phase transitions, run completion |
//! | DEBUG | Decision points, intermediate counts, config choices |
//! | TRACE | Per-sentence and per-term iteration |

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID of one mining run. Format: UUIDv7 (time-ordered).
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "corpus", "db", "jobs", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "scanner", "registry", "miner", "assembler", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "scan", "filter", "mine", "assemble", "weight", "publish"
pub const OPERATION: &str = "op";

/// Pipeline phase.
pub const PHASE: &str = "phase";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Article key being scanned.
pub const ARTICLE: &str = "article";

/// Term identifier.
pub const TERM_ID: &str = "term_id";

/// Search pattern source text.
pub const PATTERN: &str = "pattern";

/// Edge partition (graph table).
pub const PARTITION: &str = "partition";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of sentences scanned.
pub const SENTENCE_COUNT: &str = "sentence_count";

/// Number of baskets written or read.
pub const BASKET_COUNT: &str = "basket_count";

/// Number of terms involved.
pub const TERM_COUNT: &str = "term_count";

/// Number of edges produced.
pub const EDGE_COUNT: &str = "edge_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Text or JSON lines.
    pub format: LogFormat,
    /// Optional log file; enables daily rotation through tracing-appender.
    pub file: Option<String>,
    /// ANSI color override (auto-detected when `None`).
    pub ansi: Option<bool>,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file: None,
            ansi: None,
            default_filter: "inpho=info".to_string(),
        }
    }
}

impl LogConfig {
    /// Read logging configuration from the environment.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LOG_FORMAT` | `text` | `text` or `json` |
    /// | `LOG_FILE` | (stdout) | Path of a daily-rotated log file |
    /// | `LOG_ANSI` | auto | Force ANSI colors on or off |
    /// | `RUST_LOG` | `inpho=info` | Standard env filter |
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let file = std::env::var("LOG_FILE").ok().filter(|v| !v.is_empty());
        let ansi = std::env::var("LOG_ANSI")
            .ok()
            .map(|v| v == "true" || v == "1");

        Self {
            format,
            file,
            ansi,
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// Returns the appender guard when logging to a file; it must be held for
/// the lifetime of the process or buffered records are lost.
pub fn init_tracing(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = config.file {
        let path = Path::new(path);
        let dir = path.parent().unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("inpho.log");
        let appender = tracing_appender::rolling::daily(dir, name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        match config.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(config.ansi.unwrap_or(false)),
                )
                .try_init(),
        }
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))?;
        Some(guard)
    } else {
        match config.format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init(),
            LogFormat::Text => {
                let mut layer = tracing_subscriber::fmt::layer();
                if let Some(ansi) = config.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).try_init()
            }
        }
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))?;
        None
    };

    Ok(guard)
}
