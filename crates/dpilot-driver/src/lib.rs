//! # dpilot-driver - Device Bridge and Automation Session
//!
//! Talks to everything outside the process: the `adb` device bridge and the
//! remote automation server that drives each device.
//!
//! Depends on [`dpilot_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Device Discovery
//! - [`AdbBridge`] - Runs `adb devices` with a timeout
//! - [`DeviceSource`] - Fail-soft device listing (implemented by `AdbBridge`)
//! - [`parse_devices_output()`] - Parse the `adb devices` table
//! - [`ToolAvailability`] - Locate adb on PATH or in the Android SDK
//!
//! ### Automation Session
//! - [`DeviceDriver`] - Actions available on one open session
//! - [`SessionFactory`] - Opens a session for a device serial
//! - [`RemoteSession`], [`AppiumSessionFactory`] - HTTP implementation
//! - [`Locator`], [`Wait`], [`Condition`] - Finding elements
//!
//! ### Test Helpers (feature `test-helpers`)
//! - `test_utils::FakeDriver`, `test_utils::FakeSessionFactory`,
//!   `test_utils::FakeDeviceSource`

pub mod bridge;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;
pub mod webdriver;

// Public API re-exports
pub use bridge::{
    find_device, parse_devices_output, AdbBridge, DeviceSource, LocalDeviceSource,
    DEVICES_TIMEOUT,
};
pub use tool_availability::ToolAvailability;
pub use webdriver::{
    keycode, AppiumSessionFactory, Capabilities, Condition, DeviceDriver, ElementId,
    LocalDeviceDriver, Locator, RemoteSession, SessionFactory, Wait, DEFAULT_SERVER_URL,
};
