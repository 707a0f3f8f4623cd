//! droidpilot - multi-device Android UI automation runner
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dpilot_core::Result;
use droidpilot::Overrides;

/// droidpilot - run a music-app journey on every connected Android device
#[derive(Parser, Debug)]
#[command(name = "dpilot", version)]
#[command(about = "Multi-device Android UI automation runner", long_about = None)]
struct Args {
    /// Run every device without the TUI (NDJSON events on stdout)
    #[arg(long)]
    headless: bool,

    /// List ready devices and exit
    #[arg(long, conflicts_with = "headless")]
    devices: bool,

    /// Artist to search for (overrides flow.artist)
    #[arg(long, value_name = "NAME")]
    artist: Option<String>,

    /// With --headless: only run on this device (serial or serial prefix)
    #[arg(long, value_name = "ID", requires = "headless")]
    device: Option<String>,

    /// Automation server URL (overrides server.url)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Directory holding config.toml (default: ./.droidpilot)
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Write a commented default config.toml and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config_dir = droidpilot::app::resolve_config_dir(args.config_dir);

    if args.init_config {
        let path = droidpilot::init_config(&config_dir)?;
        eprintln!("Config file: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if args.devices {
        let devices = droidpilot::list_devices(&config_dir).await?;
        return Ok(if devices.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let overrides = Overrides {
        artist: args.artist,
        server_url: args.server,
        device: args.device,
    };

    if args.headless {
        let summary = droidpilot::run_headless(&config_dir, &overrides).await?;
        return Ok(if summary.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    droidpilot::run_tui(&config_dir, &overrides).await?;
    Ok(ExitCode::SUCCESS)
}
