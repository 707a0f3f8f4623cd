//! Settings parser for .droidpilot/config.toml

use super::types::Settings;
use dpilot_core::prelude::*;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".droidpilot";

/// `.droidpilot` directory under a project directory
pub fn default_config_dir(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_DIR)
}

/// Path of the settings file inside a config directory
pub fn config_file(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILENAME)
}

/// Load settings from `<config_dir>/config.toml`
///
/// Returns default settings if file doesn't exist or can't be parsed.
/// Validation is left to the caller.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = config_file(config_dir);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create the config directory with a commented default config.toml
///
/// Never overwrites an existing file. Returns the path of the config file.
pub fn init_config_dir(config_dir: &Path) -> Result<PathBuf> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).map_err(|e| {
            Error::config(format!("Failed to create {}: {}", config_dir.display(), e))
        })?;
    }

    let config_path = config_file(config_dir);
    if config_path.exists() {
        debug!("{:?} already exists, leaving it alone", config_path);
        return Ok(config_path);
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    info!("Wrote default settings to {:?}", config_path);

    Ok(config_path)
}

const DEFAULT_CONFIG: &str = r#"# droidpilot configuration

[server]
url = "http://127.0.0.1:4723"   # Automation server endpoint
request_timeout_secs = 60

[capabilities]
automation_name = "UiAutomator2"
device_name = "nophone"
no_reset = true
dont_stop_app_on_reset = true
adb_exec_timeout_ms = 60000
android_install_timeout_ms = 120000

[app]
package = "com.spotify.music"
activity = "com.spotify.music.MainActivity"

[flow]
artist = "Martin Garrix"        # Default search, editable in the UI
pause_min_secs = 2.0            # Random pause between steps
pause_max_secs = 5.0
element_timeout_secs = 30
install_check_timeout_secs = 30 # Slower checks count as "not installed"
launch_settle_ms = 3000
results_settle_ms = 3000
field_settle_ms = 1000
close_pause_min_secs = 3.0       # After closing the app, before going home
close_pause_max_secs = 5.0
recovery_pause_min_secs = 5.0
recovery_pause_max_secs = 10.0

[banners]
max_iterations = 6
max_total_secs = 60
dismiss_texts = ["Continue", "Allow", "dismiss", "Dismiss", "Home, Tab 1 of 4"]
ad_keywords = ["Advertisement"]
close_texts = ["X", "Close", "✕", "×", "Dismiss"]

[device_bridge]
adb_path = ""                   # Empty = PATH, then $ANDROID_HOME/platform-tools
timeout_secs = 30

[ui]
status_refresh_ms = 1000
device_refresh_secs = 5
"#;
