//! Configuration file parsing for droidpilot
//!
//! Supports:
//! - `.droidpilot/config.toml` - Global settings (server, app, journey pacing,
//!   banner heuristics, device bridge, UI refresh rates)

pub mod settings;
pub mod types;

pub use settings::{config_file, default_config_dir, init_config_dir, load_settings};
pub use types::*;
