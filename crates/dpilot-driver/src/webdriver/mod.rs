//! Remote automation session client
//!
//! Speaks the W3C WebDriver protocol plus Appium's `mobile:` extension
//! commands over HTTP. Page objects depend only on the [`DeviceDriver`]
//! trait, never on [`RemoteSession`] directly.

pub mod capabilities;
pub mod driver;
pub mod locator;
pub mod protocol;
pub mod session;
pub mod wait;

pub use capabilities::Capabilities;
pub use driver::{keycode, DeviceDriver, ElementId, LocalDeviceDriver, SessionFactory};
pub use locator::Locator;
pub use session::{AppiumSessionFactory, RemoteSession, DEFAULT_SERVER_URL};
pub use wait::{Condition, Wait};
