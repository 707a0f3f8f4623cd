//! Entry points shared by the binary: settings, wiring and the three modes

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dpilot_app::config::{self, Settings};
use dpilot_app::{ArtistJourney, FlowExecutor, FlowParams};
use dpilot_core::logging::{self, LogOptions};
use dpilot_core::prelude::*;
use dpilot_driver::{AdbBridge, AppiumSessionFactory, ToolAvailability};

use crate::headless::{self, HeadlessEvent, RunSummary};
use crate::signals;

/// The executor as wired for real devices
pub type DeviceExecutor = FlowExecutor<AppiumSessionFactory, ArtistJourney, AdbBridge>;

/// Command-line values that take precedence over `config.toml`
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub artist: Option<String>,
    pub server_url: Option<String>,
    /// Headless only: run on this device serial (or serial prefix)
    pub device: Option<String>,
}

/// Load, override and validate settings
pub fn load_settings(config_dir: &Path, overrides: &Overrides) -> Result<Settings> {
    let mut settings = config::load_settings(config_dir);

    if let Some(artist) = &overrides.artist {
        let artist = artist.trim();
        if artist.is_empty() {
            return Err(Error::config_invalid("--artist must not be empty"));
        }
        settings.flow.artist = artist.to_string();
    }
    if let Some(url) = &overrides.server_url {
        settings.server.url = url.clone();
    }

    settings.validate()?;
    Ok(settings)
}

/// Build the executor for real devices, plus what was found of adb
pub async fn build_executor(settings: &Settings) -> Result<(DeviceExecutor, ToolAvailability)> {
    let tools = ToolAvailability::check(settings.device_bridge.configured_path()).await;
    if let Some(message) = tools.adb_unavailable_message() {
        warn!("{}", message);
    }

    let program = tools
        .adb_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("adb"));
    let bridge = AdbBridge::new(program).with_timeout(settings.device_bridge.timeout());

    let factory = AppiumSessionFactory::new(
        settings.server.url.clone(),
        settings.capabilities.to_capabilities(),
    )
    .with_request_timeout(settings.server.request_timeout());
    let journey = ArtistJourney::from_settings(settings)?;

    info!(
        "Automation server {}, app {}, adb {}",
        factory.endpoint(),
        journey.package(),
        bridge.program().display()
    );

    Ok((FlowExecutor::new(factory, journey, bridge), tools))
}

/// Run the interactive front end
pub async fn run_tui(config_dir: &Path, overrides: &Overrides) -> Result<()> {
    color_eyre::install().map_err(|e| Error::terminal(e.to_string()))?;

    // Logs go to file only, the TUI owns the terminal
    logging::init(LogOptions::file_only())?;
    banner("interactive");

    let settings = load_settings(config_dir, overrides)?;
    let (executor, tools) = build_executor(&settings).await?;

    let result = dpilot_tui::run(settings, Arc::new(executor), tools).await;
    if let Err(ref e) = result {
        error!("Application error: {:?}", e);
    }

    info!("droidpilot exiting");
    result
}

/// Run the journey on every device, reporting NDJSON on stdout
///
/// Returns the batch totals; Ctrl+C stops all runs and waits for teardown.
pub async fn run_headless(config_dir: &Path, overrides: &Overrides) -> Result<RunSummary> {
    logging::init(LogOptions::with_console())?;
    banner("headless");

    let settings = match load_settings(config_dir, overrides) {
        Ok(settings) => settings,
        Err(e) => {
            HeadlessEvent::error(e.to_string(), true).emit();
            return Err(e);
        }
    };
    let (executor, tools) = build_executor(&settings).await?;
    if let Some(message) = tools.adb_unavailable_message() {
        HeadlessEvent::error(message, false).emit();
    }

    let params = FlowParams::new(settings.flow.artist.clone());
    let summary = headless::run_headless(
        &executor,
        params,
        overrides.device.as_deref(),
        signals::shutdown_signal(),
        |event| event.emit(),
    )
    .await;

    info!("droidpilot headless mode exiting");
    Ok(summary)
}

/// Print ready devices, one per line, and return them
pub async fn list_devices(config_dir: &Path) -> Result<Vec<dpilot_core::Device>> {
    logging::init(LogOptions::with_console())?;

    let settings = config::load_settings(config_dir);
    let bridge = AdbBridge::locate(settings.device_bridge.configured_path())?
        .with_timeout(settings.device_bridge.timeout());
    let devices = bridge.discover().await.context("Listing devices")?;

    if devices.is_empty() {
        println!("No devices found.");
    }
    for device in &devices {
        println!("{}\t{}", device.id, device.kind_label());
    }
    Ok(devices)
}

/// Write a default config file; returns its path
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    config::init_config_dir(config_dir).context("Writing the default config")
}

/// Config directory from `--config-dir` or `.droidpilot` under the cwd
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        config::default_config_dir(&cwd)
    })
}

fn banner(mode: &str) {
    info!("═══════════════════════════════════════════════════════");
    info!("droidpilot {} starting ({} mode)", env!("CARGO_PKG_VERSION"), mode);
    info!("═══════════════════════════════════════════════════════");
}
