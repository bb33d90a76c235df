//! Tracing setup shared by the server binary and the one-shot CLI commands.
//!
//! Console and log file receive the same stream. `LogFormat::Pretty` is the full fmt layout
//! (level, target, thread, span close events); `LogFormat::Json` emits one JSON object per line
//! for log shippers.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, fmt::writer::MakeWriterExt, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Registry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Installs the global subscriber writing to stdout and appending to `log_file_path`.
///
/// Level comes from `RUST_LOG` (default `info`); load `.env` first so the variable is visible.
/// The parent directory of the log file is created when missing.
pub fn init_tracing(log_file_path: &str, format: LogFormat) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)?,
    );
    let writer = io::stdout.and(file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = Registry::default().with(env_filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))
}
