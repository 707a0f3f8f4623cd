//! Driver traits the page objects are written against
//!
//! [`DeviceDriver`] is the surface of one open automation session;
//! [`SessionFactory`] opens those sessions. The executor and the journey are
//! generic over both so tests can substitute in-memory fakes.

use dpilot_core::prelude::*;
use std::fmt;
use std::future::Future;

use super::Locator;

/// Opaque element reference returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Android key codes
pub mod keycode {
    pub const HOME: u32 = 3;
    pub const BACK: u32 = 4;
    pub const VOLUME_UP: u32 = 24;
    pub const VOLUME_DOWN: u32 = 25;
    pub const ENTER: u32 = 66;
    pub const DEL: u32 = 67;
    pub const MENU: u32 = 82;
    pub const SEARCH: u32 = 84;
    pub const MEDIA_BACKWARD: u32 = 123;
    pub const MEDIA_FORWARD: u32 = 124;
}

/// One open automation session bound to a device
#[trait_variant::make(DeviceDriver: Send)]
pub trait LocalDeviceDriver {
    /// All elements matching `locator`; empty when nothing matches
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>>;

    /// Elements matching `locator` beneath `parent`
    async fn find_child_elements(
        &self,
        parent: &ElementId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>>;

    async fn click(&self, element: &ElementId) -> Result<()>;

    /// Type into a text field
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()>;

    async fn is_displayed(&self, element: &ElementId) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementId) -> Result<bool>;

    async fn press_keycode(&self, keycode: u32) -> Result<()>;

    async fn is_app_installed(&self, app_id: &str) -> Result<bool>;

    /// Bring an app to the foreground, launching it if needed
    async fn activate_app(&self, app_id: &str) -> Result<()>;

    /// Returns whether the app was running
    async fn terminate_app(&self, app_id: &str) -> Result<bool>;

    /// Package of the foreground app, if the server reports one
    async fn current_package(&self) -> Result<Option<String>>;

    /// End the session. The handle must not be used afterwards.
    async fn quit(&self) -> Result<()>;
}

/// Opens automation sessions for devices
pub trait SessionFactory: Send + Sync + 'static {
    type Driver: DeviceDriver + Sync + 'static;

    fn open(&self, device_id: &str) -> impl Future<Output = Result<Self::Driver>> + Send;
}
