//! Session capabilities sent when opening an automation session

use serde::Serialize;
use serde_json::{json, Value};

/// Capability set for one Android device
///
/// Serialized under `capabilities.alwaysMatch`; vendor keys carry the
/// `appium:` prefix the server expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    #[serde(rename = "platformName")]
    pub platform_name: String,

    #[serde(rename = "appium:automationName")]
    pub automation_name: String,

    #[serde(rename = "appium:deviceName")]
    pub device_name: String,

    /// Serial of the device to drive
    #[serde(rename = "appium:udid")]
    pub udid: String,

    #[serde(rename = "appium:noReset")]
    pub no_reset: bool,

    #[serde(rename = "appium:dontStopAppOnReset")]
    pub dont_stop_app_on_reset: bool,

    #[serde(rename = "appium:adbExecTimeout")]
    pub adb_exec_timeout_ms: u64,

    #[serde(rename = "appium:androidInstallTimeout")]
    pub android_install_timeout_ms: u64,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            platform_name: "Android".to_string(),
            automation_name: "UiAutomator2".to_string(),
            device_name: "nophone".to_string(),
            udid: String::new(),
            no_reset: true,
            dont_stop_app_on_reset: true,
            adb_exec_timeout_ms: 60_000,
            android_install_timeout_ms: 120_000,
        }
    }
}

impl Capabilities {
    /// Same capabilities, targeting another device
    pub fn for_device(&self, udid: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            ..self.clone()
        }
    }

    /// Body of the `POST /session` request
    pub fn new_session_body(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": self,
                "firstMatch": [{}],
            }
        })
    }
}
