//! Configuration types for droidpilot
//!
//! Defines `Settings` (`.droidpilot/config.toml`) and one struct per section.
//! Every field has a default, so a partial file is always valid TOML input.

use dpilot_core::prelude::*;
use dpilot_driver::{Capabilities, DEFAULT_SERVER_URL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings (.droidpilot/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub capabilities: CapabilitySettings,

    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub flow: FlowSettings,

    #[serde(default)]
    pub banners: BannerSettings,

    #[serde(default)]
    pub device_bridge: DeviceBridgeSettings,

    #[serde(default)]
    pub ui: UiSettings,
}

impl Settings {
    /// Reject settings the journey cannot run with
    pub fn validate(&self) -> Result<()> {
        check_range(
            "flow.pause_min_secs",
            self.flow.pause_min_secs,
            self.flow.pause_max_secs,
        )?;
        check_range(
            "flow.close_pause_min_secs",
            self.flow.close_pause_min_secs,
            self.flow.close_pause_max_secs,
        )?;
        check_range(
            "flow.recovery_pause_min_secs",
            self.flow.recovery_pause_min_secs,
            self.flow.recovery_pause_max_secs,
        )?;

        if self.app.package.trim().is_empty() {
            return Err(Error::config_invalid("app.package must not be empty"));
        }
        if self.server.url.trim().is_empty() {
            return Err(Error::config_invalid("server.url must not be empty"));
        }
        if self.banners.max_iterations == 0 {
            return Err(Error::config_invalid("banners.max_iterations must be at least 1"));
        }

        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 {
        return Err(Error::config_invalid(format!(
            "{} range must be finite and non-negative (got {}..{})",
            name, min, max
        )));
    }
    if min > max {
        return Err(Error::config_invalid(format!(
            "{} ({}) must not exceed the maximum ({})",
            name, min, max
        )));
    }
    Ok(())
}

/// Automation server connection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Capability template shared by every session
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CapabilitySettings {
    pub automation_name: String,
    pub device_name: String,
    pub no_reset: bool,
    pub dont_stop_app_on_reset: bool,
    pub adb_exec_timeout_ms: u64,
    pub android_install_timeout_ms: u64,
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        let caps = Capabilities::default();
        Self {
            automation_name: caps.automation_name,
            device_name: caps.device_name,
            no_reset: caps.no_reset,
            dont_stop_app_on_reset: caps.dont_stop_app_on_reset,
            adb_exec_timeout_ms: caps.adb_exec_timeout_ms,
            android_install_timeout_ms: caps.android_install_timeout_ms,
        }
    }
}

impl CapabilitySettings {
    /// Capability template without a device serial
    pub fn to_capabilities(&self) -> Capabilities {
        Capabilities {
            automation_name: self.automation_name.clone(),
            device_name: self.device_name.clone(),
            no_reset: self.no_reset,
            dont_stop_app_on_reset: self.dont_stop_app_on_reset,
            adb_exec_timeout_ms: self.adb_exec_timeout_ms,
            android_install_timeout_ms: self.android_install_timeout_ms,
            ..Capabilities::default()
        }
    }
}

/// App under automation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default = "default_package")]
    pub package: String,

    /// Launch activity, informational only; activation goes by package
    #[serde(default = "default_activity")]
    pub activity: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            package: default_package(),
            activity: default_activity(),
        }
    }
}

fn default_package() -> String {
    "com.spotify.music".to_string()
}

fn default_activity() -> String {
    "com.spotify.music.MainActivity".to_string()
}

/// Journey timing and parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Artist searched for when none is given
    pub artist: String,
    pub pause_min_secs: f64,
    pub pause_max_secs: f64,
    pub element_timeout_secs: u64,
    pub install_check_timeout_secs: u64,
    pub launch_settle_ms: u64,
    pub results_settle_ms: u64,
    pub field_settle_ms: u64,
    /// Pause after closing the app, before going home
    pub close_pause_min_secs: f64,
    pub close_pause_max_secs: f64,
    /// Pause after re-opening the app during recovery
    pub recovery_pause_min_secs: f64,
    pub recovery_pause_max_secs: f64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            artist: "Martin Garrix".to_string(),
            pause_min_secs: 2.0,
            pause_max_secs: 5.0,
            element_timeout_secs: 30,
            install_check_timeout_secs: 30,
            launch_settle_ms: 3000,
            results_settle_ms: 3000,
            field_settle_ms: 1000,
            close_pause_min_secs: 3.0,
            close_pause_max_secs: 5.0,
            recovery_pause_min_secs: 5.0,
            recovery_pause_max_secs: 10.0,
        }
    }
}

/// Dialog / ad dismissal heuristics
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BannerSettings {
    pub max_iterations: u32,
    pub max_total_secs: u64,
    /// Exact text or content description of tappable dismiss buttons
    pub dismiss_texts: Vec<String>,
    /// Substrings marking an advertisement
    pub ad_keywords: Vec<String>,
    /// Close buttons searched inside an advertisement
    pub close_texts: Vec<String>,
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            max_total_secs: 60,
            dismiss_texts: strings(&["Continue", "Allow", "dismiss", "Dismiss", "Home, Tab 1 of 4"]),
            ad_keywords: strings(&["Advertisement"]),
            close_texts: strings(&["X", "Close", "✕", "×", "Dismiss"]),
        }
    }
}

impl BannerSettings {
    pub fn max_total(&self) -> Duration {
        Duration::from_secs(self.max_total_secs)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// adb invocation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceBridgeSettings {
    /// Empty = look up adb on PATH / in the Android SDK
    #[serde(default)]
    pub adb_path: String,

    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeviceBridgeSettings {
    fn default() -> Self {
        Self {
            adb_path: String::new(),
            timeout_secs: default_bridge_timeout(),
        }
    }
}

impl DeviceBridgeSettings {
    pub fn configured_path(&self) -> Option<&str> {
        Some(self.adb_path.trim()).filter(|p| !p.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bridge_timeout() -> u64 {
    30
}

/// Terminal front end refresh rates
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiSettings {
    pub status_refresh_ms: u64,
    pub device_refresh_secs: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            status_refresh_ms: 1000,
            device_refresh_secs: 5,
        }
    }
}

impl UiSettings {
    pub fn status_refresh(&self) -> Duration {
        Duration::from_millis(self.status_refresh_ms.max(50))
    }

    pub fn device_refresh(&self) -> Duration {
        Duration::from_secs(self.device_refresh_secs.max(1))
    }
}
