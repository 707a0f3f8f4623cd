//! droidpilot - drive a music-app journey on every connected Android device
//!
//! The binary (`dpilot`) is a thin clap layer over this library:
//! - [`app`]: settings, wiring of the real executor, TUI / headless / listing modes
//! - [`headless`]: NDJSON batch runner
//! - [`signals`]: SIGINT/SIGTERM handling for graceful shutdown

pub mod app;
pub mod headless;
pub mod signals;

pub use app::{init_config, list_devices, run_headless, run_tui, Overrides};
pub use headless::{HeadlessEvent, RunSummary};
