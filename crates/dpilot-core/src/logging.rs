//! Logging configuration using tracing
//!
//! Every run task is wrapped in a `device{id=...}` span, so each line written
//! by a run carries the serial of the device it belongs to.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Log file name inside the log directory (rotated daily)
pub const LOG_FILE_NAME: &str = "droidpilot.log";

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "DPILOT_LOG";

/// Logging options chosen by the entry point
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Also write logs to stderr. Off for the TUI, which owns the terminal.
    pub console: bool,

    /// Override the log directory (defaults to the platform data dir)
    pub log_dir: Option<PathBuf>,
}

impl LogOptions {
    pub fn file_only() -> Self {
        Self::default()
    }

    pub fn with_console() -> Self {
        Self {
            console: true,
            log_dir: None,
        }
    }
}

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/droidpilot/logs/`
/// Log level is controlled by `DPILOT_LOG` environment variable.
///
/// # Examples
/// ```bash
/// DPILOT_LOG=debug dpilot --headless
/// DPILOT_LOG=dpilot_app=trace dpilot
/// ```
pub fn init(options: LogOptions) -> Result<()> {
    let log_dir = match options.log_dir {
        Some(dir) => dir,
        None => get_log_directory()?,
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ));

    let console_layer = options.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .with_timer(fmt::time::ChronoLocal::new("%H:%M:%S".to_string()))
    });

    tracing_subscriber::registry()
        .with(default_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("droidpilot starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Filter from `DPILOT_LOG`, falling back to info for our crates
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        EnvFilter::new("droidpilot=info,dpilot_core=info,dpilot_driver=info,dpilot_app=info,dpilot_tui=info,warn")
    })
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("droidpilot").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join(LOG_FILE_NAME))
}
