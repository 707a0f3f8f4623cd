//! Device discovery using `adb devices`

use dpilot_core::prelude::*;
use dpilot_core::Device;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::tool_availability::ToolAvailability;

/// Default timeout for the `adb devices` command
pub const DEVICES_TIMEOUT: Duration = Duration::from_secs(30);

/// State token adb prints for a device that is ready for commands
const READY_STATE: &str = "device";

/// Header adb prints before the device table
const HEADER_PREFIX: &str = "List of devices attached";

/// Source of ready devices
///
/// The executor's `start_all` and both front ends poll this. Implementations
/// never fail: any problem is logged and yields an empty list.
#[trait_variant::make(DeviceSource: Send)]
pub trait LocalDeviceSource {
    /// Ready devices, in the order the bridge reports them
    async fn list_devices(&self) -> Vec<Device>;
}

/// The Android device bridge, invoked as a child process
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: PathBuf,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEVICES_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Locate adb (configured path first, then PATH and the SDK env vars)
    pub fn locate(configured: Option<&str>) -> Result<Self> {
        let program = ToolAvailability::resolve_adb(configured).ok_or(Error::AdbNotFound)?;
        Ok(Self::new(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Discover ready devices, surfacing every failure
    ///
    /// Front ends use [`DeviceSource::list_devices`] instead, which folds
    /// failures into an empty list.
    pub async fn discover(&self) -> Result<Vec<Device>> {
        let start = std::time::Instant::now();

        debug!("Discovering devices with {}", self.program.display());

        let stdout = timeout(self.timeout, self.run_devices())
            .await
            .map_err(|_| Error::device_bridge("adb devices timed out"))??;

        let devices = parse_devices_output(&stdout);

        info!(
            "Discovered {} device(s) in {:?}",
            devices.len(),
            start.elapsed()
        );

        Ok(devices)
    }

    /// Run `adb devices` and return its stdout
    async fn run_devices(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("devices")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::AdbNotFound
                } else {
                    Error::device_bridge(format!("Failed to run adb devices: {}", e))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!("adb devices stdout: {}", stdout);
        if !stderr.is_empty() {
            debug!("adb devices stderr: {}", stderr);
        }

        if !output.status.success() {
            return Err(Error::device_bridge(format!(
                "adb devices exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

impl DeviceSource for AdbBridge {
    async fn list_devices(&self) -> Vec<Device> {
        match self.discover().await {
            Ok(devices) => devices,
            Err(e) => {
                error!("Device discovery failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Parse the table printed by `adb devices`
///
/// Only rows whose state is exactly `device` are kept; `offline`,
/// `unauthorized`, `recovery` and friends are dropped. Daemon start-up
/// chatter (lines starting with `*`) and the header are skipped.
pub fn parse_devices_output(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(HEADER_PREFIX) && !line.starts_with('*'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let id = fields.next()?;
            let state = fields.next()?;
            (state == READY_STATE).then(|| Device::new(id))
        })
        .collect()
}

/// Find a device by serial or serial prefix
pub fn find_device<'a>(devices: &'a [Device], specifier: &str) -> Option<&'a Device> {
    devices
        .iter()
        .find(|d| d.id == specifier)
        .or_else(|| devices.iter().find(|d| d.matches(specifier)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices_typical_output() {
        let output = "List of devices attached\nemulator-5554\tdevice\nR5CT227FYRV\tdevice\n\n";
        let devices = parse_devices_output(output);

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "emulator-5554");
        assert!(devices[0].emulator);
        assert_eq!(devices[1].id, "R5CT227FYRV");
        assert!(!devices[1].emulator);
    }

    #[test]
    fn test_parse_devices_skips_non_ready_states() {
        let output = "List of devices attached
emulator-5554\toffline
R5CT227FYRV\tunauthorized
0123456789\tdevice
HT4A1JT00123\trecovery
ZY22\tno permissions
";
        let devices = parse_devices_output(output);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "0123456789");
    }

    #[test]
    fn test_parse_devices_state_must_match_exactly() {
        let output = "List of devices attached\nA1\tdevices\nA2\tDevice\nA3\tdevice\n";
        let devices = parse_devices_output(output);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "A3");
    }

    #[test]
    fn test_parse_devices_with_daemon_startup_lines() {
        let output = "* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
emulator-5556\tdevice
";
        let devices = parse_devices_output(output);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "emulator-5556");
    }

    #[test]
    fn test_parse_devices_header_only() {
        assert!(parse_devices_output("List of devices attached\n\n").is_empty());
        assert!(parse_devices_output("").is_empty());
    }

    #[test]
    fn test_parse_devices_space_separated_and_network_serials() {
        let output = "List of devices attached\n192.168.1.20:5555   device\n";
        let devices = parse_devices_output(output);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "192.168.1.20:5555");
        assert!(!devices[0].emulator);
    }

    #[test]
    fn test_parse_devices_line_without_state() {
        let output = "List of devices attached\nlonely-serial\n";
        assert!(parse_devices_output(output).is_empty());
    }

    #[test]
    fn test_find_device_prefers_exact_match() {
        let devices = vec![Device::new("emulator-55540"), Device::new("emulator-5554")];

        let found = find_device(&devices, "emulator-5554").unwrap();
        assert_eq!(found.id, "emulator-5554");

        let found = find_device(&devices, "EMULATOR-555").unwrap();
        assert_eq!(found.id, "emulator-55540");

        assert!(find_device(&devices, "R5CT").is_none());
    }

    #[tokio::test]
    async fn test_missing_program_is_soft_failure() {
        let bridge = AdbBridge::new("/nonexistent/path/to/adb");

        let err = bridge.discover().await.unwrap_err();
        assert!(matches!(err, Error::AdbNotFound));

        assert!(DeviceSource::list_devices(&bridge).await.is_empty());
    }
}
