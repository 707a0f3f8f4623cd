//! Tool availability checking for the device bridge
//!
//! Locates the `adb` executable: an explicitly configured path wins, then
//! `adb` on `PATH`, then the platform-tools directory of an Android SDK named
//! by `ANDROID_HOME` or `ANDROID_SDK_ROOT`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the bridge executable on this platform
#[cfg(windows)]
const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_BINARY: &str = "adb";

/// Cached availability of external tools
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    /// Whether `adb version` ran successfully
    pub adb: bool,

    /// Path to adb if found
    pub adb_path: Option<PathBuf>,
}

impl ToolAvailability {
    /// Check tool availability (run once at startup)
    pub async fn check(configured: Option<&str>) -> Self {
        let Some(path) = Self::resolve_adb(configured) else {
            return Self::default();
        };

        let adb = Command::new(&path)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .inspect_err(|e| tracing::debug!("adb check failed for {}: {}", path.display(), e))
            .unwrap_or(false);

        Self {
            adb,
            adb_path: Some(path),
        }
    }

    /// Resolve the adb program without running it
    pub fn resolve_adb(configured: Option<&str>) -> Option<PathBuf> {
        if let Some(configured) = configured.map(str::trim).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(configured));
        }

        if let Ok(path) = which::which(ADB_BINARY) {
            return Some(path);
        }

        Self::get_sdk_adb_paths()
            .into_iter()
            .find(|path| path.is_file())
    }

    /// SDK locations to try when adb is not on PATH
    fn get_sdk_adb_paths() -> Vec<PathBuf> {
        ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .map(|root| sdk_adb_path(Path::new(&root)))
            .collect()
    }

    /// Get user-friendly message when adb is unavailable
    pub fn adb_unavailable_message(&self) -> Option<&'static str> {
        if self.adb {
            None
        } else {
            Some("adb not found. Install Android platform-tools or set ANDROID_HOME.")
        }
    }
}

fn sdk_adb_path(sdk_root: &Path) -> PathBuf {
    sdk_root.join("platform-tools").join(ADB_BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_tool_availability_default() {
        let availability = ToolAvailability::default();
        assert!(!availability.adb);
        assert!(availability.adb_path.is_none());
        assert!(availability.adb_unavailable_message().is_some());
    }

    #[test]
    fn test_available_no_message() {
        let availability = ToolAvailability {
            adb: true,
            adb_path: Some(PathBuf::from("/opt/sdk/platform-tools/adb")),
        };
        assert!(availability.adb_unavailable_message().is_none());
    }

    #[test]
    fn test_configured_path_wins() {
        let path = ToolAvailability::resolve_adb(Some("/custom/adb")).unwrap();
        assert_eq!(path, PathBuf::from("/custom/adb"));
    }

    #[test]
    fn test_blank_configured_path_is_ignored() {
        // Falls through to PATH / SDK lookup, which may or may not succeed here
        let resolved = ToolAvailability::resolve_adb(Some("   "));
        assert_ne!(resolved, Some(PathBuf::from("   ")));
    }

    #[test]
    fn test_sdk_adb_path_layout() {
        let path = sdk_adb_path(Path::new("/opt/android"));
        assert!(path.starts_with("/opt/android/platform-tools"));
        assert!(path.ends_with(ADB_BINARY));
    }

    #[test]
    #[serial]
    fn test_sdk_paths_include_env_vars() {
        std::env::set_var("ANDROID_HOME", "/test/android");
        std::env::set_var("ANDROID_SDK_ROOT", "/test/sdk");

        let paths = ToolAvailability::get_sdk_adb_paths();
        assert!(paths.iter().any(|p| p.starts_with("/test/android")));
        assert!(paths.iter().any(|p| p.starts_with("/test/sdk")));

        std::env::remove_var("ANDROID_HOME");
        std::env::remove_var("ANDROID_SDK_ROOT");
    }

    #[tokio::test]
    async fn test_check_with_missing_program() {
        let availability = ToolAvailability::check(Some("/nonexistent/adb")).await;
        assert!(!availability.adb);
        assert_eq!(
            availability.adb_path,
            Some(PathBuf::from("/nonexistent/adb"))
        );
    }
}
