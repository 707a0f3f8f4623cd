//! Test utilities for driver-level types
//!
//! In-memory stand-ins for the device bridge and the automation server:
//! - [`FakeDriver`] - scripted screen contents plus a record of every action
//! - [`FakeSessionFactory`] - hands out fake drivers per device id
//! - [`FakeDeviceSource`] - a fixed, mutable device list
//!
//! `FakeDriver` clones share state, so a test can keep a handle to a driver
//! it gave to the code under test and inspect it afterwards.

use dpilot_core::prelude::*;
use dpilot_core::Device;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::bridge::DeviceSource;
use crate::webdriver::protocol::STALE_ELEMENT_REFERENCE;
use crate::webdriver::{DeviceDriver, ElementId, Locator, SessionFactory};

/// Creates a device list from serials
pub fn test_devices(ids: &[&str]) -> Vec<Device> {
    ids.iter().map(|id| Device::new(*id)).collect()
}

#[derive(Debug, Default)]
struct FakeScreen {
    roots: HashMap<Locator, Vec<String>>,
    children: HashMap<(String, Locator), Vec<String>>,
    hidden: HashSet<String>,
    disabled: HashSet<String>,
    /// Remaining `is_displayed` calls that report a stale element
    stale: HashMap<String, usize>,
    /// Elements that disappear from the screen once tapped
    dismissable: HashSet<String>,
    removed: HashSet<String>,
    /// Lookups for these locators never resolve
    hanging: HashSet<Locator>,
    fail_lookups: bool,

    installed: bool,
    install_check_delay: Option<Duration>,
    install_check_error: bool,
    activate_error: bool,
    current_package: Option<String>,
    /// Package reported after `activate_app`; the activated id when unset
    foreground_after_activate: Option<String>,
    quit_error: bool,

    lookups: usize,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    keycodes: Vec<u32>,
    activations: Vec<String>,
    terminations: Vec<String>,
    quits: usize,
}

/// Scripted in-memory automation session
#[derive(Debug, Clone)]
pub struct FakeDriver {
    screen: Arc<Mutex<FakeScreen>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    /// Empty screen; every app counts as installed
    pub fn new() -> Self {
        let screen = FakeScreen {
            installed: true,
            ..FakeScreen::default()
        };
        Self {
            screen: Arc::new(Mutex::new(screen)),
        }
    }

    fn screen(&self) -> MutexGuard<'_, FakeScreen> {
        self.screen.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────────

    pub fn with_elements<I, S>(self, locator: &Locator, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.screen()
            .roots
            .entry(locator.clone())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_children<I, S>(self, parent: &str, locator: &Locator, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.screen()
            .children
            .entry((parent.to_string(), locator.clone()))
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_hidden(self, id: &str) -> Self {
        self.screen().hidden.insert(id.to_string());
        self
    }

    pub fn with_disabled(self, id: &str) -> Self {
        self.screen().disabled.insert(id.to_string());
        self
    }

    /// The next `times` visibility checks of `id` fail as stale
    pub fn with_stale(self, id: &str, times: usize) -> Self {
        self.screen().stale.insert(id.to_string(), times);
        self
    }

    /// Tapping `id` removes it from every lookup result
    pub fn with_dismissable(self, id: &str) -> Self {
        self.screen().dismissable.insert(id.to_string());
        self
    }

    /// Lookups for `locator` never complete
    pub fn with_hanging_lookup(self, locator: &Locator) -> Self {
        self.screen().hanging.insert(locator.clone());
        self
    }

    /// Every lookup fails with a session error
    pub fn with_failing_lookups(self) -> Self {
        self.screen().fail_lookups = true;
        self
    }

    pub fn with_installed(self, installed: bool) -> Self {
        self.screen().installed = installed;
        self
    }

    pub fn with_install_check_delay(self, delay: Duration) -> Self {
        self.screen().install_check_delay = Some(delay);
        self
    }

    pub fn with_install_check_error(self) -> Self {
        self.screen().install_check_error = true;
        self
    }

    pub fn with_activate_error(self) -> Self {
        self.screen().activate_error = true;
        self
    }

    pub fn with_current_package(self, package: &str) -> Self {
        self.screen().current_package = Some(package.to_string());
        self
    }

    pub fn with_foreground_after_activate(self, package: &str) -> Self {
        self.screen().foreground_after_activate = Some(package.to_string());
        self
    }

    pub fn with_quit_error(self) -> Self {
        self.screen().quit_error = true;
        self
    }

    // ─────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────

    pub fn lookups(&self) -> usize {
        self.screen().lookups
    }

    pub fn clicks(&self) -> Vec<String> {
        self.screen().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.screen().typed.clone()
    }

    pub fn keycodes(&self) -> Vec<u32> {
        self.screen().keycodes.clone()
    }

    pub fn activations(&self) -> Vec<String> {
        self.screen().activations.clone()
    }

    pub fn terminations(&self) -> Vec<String> {
        self.screen().terminations.clone()
    }

    pub fn quits(&self) -> usize {
        self.screen().quits
    }

    fn visible(screen: &FakeScreen, ids: Option<&Vec<String>>) -> Vec<ElementId> {
        ids.map(|ids| {
            ids.iter()
                .filter(|id| !screen.removed.contains(*id))
                .map(ElementId::new)
                .collect()
        })
        .unwrap_or_default()
    }

    /// Records the lookup; `Err(())` means the lookup should hang
    fn lookup(
        &self,
        locator: &Locator,
        parent: Option<&ElementId>,
    ) -> std::result::Result<Result<Vec<ElementId>>, ()> {
        let mut screen = self.screen();
        screen.lookups += 1;

        if screen.hanging.contains(locator) {
            return Err(());
        }
        if screen.fail_lookups {
            return Ok(Err(Error::session("lookup failed")));
        }

        let found = match parent {
            None => Self::visible(&screen, screen.roots.get(locator)),
            Some(parent) => Self::visible(
                &screen,
                screen
                    .children
                    .get(&(parent.as_str().to_string(), locator.clone())),
            ),
        };
        Ok(Ok(found))
    }
}

impl DeviceDriver for FakeDriver {
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>> {
        match self.lookup(locator, None) {
            Ok(result) => result,
            Err(()) => std::future::pending().await,
        }
    }

    async fn find_child_elements(
        &self,
        parent: &ElementId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>> {
        match self.lookup(locator, Some(parent)) {
            Ok(result) => result,
            Err(()) => std::future::pending().await,
        }
    }

    async fn click(&self, element: &ElementId) -> Result<()> {
        let mut screen = self.screen();
        let id = element.as_str().to_string();
        if screen.dismissable.contains(&id) {
            screen.removed.insert(id.clone());
        }
        screen.clicks.push(id);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        self.screen()
            .typed
            .push((element.as_str().to_string(), text.to_string()));
        Ok(())
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool> {
        let mut screen = self.screen();
        if let Some(remaining) = screen.stale.get_mut(element.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::webdriver(
                    STALE_ELEMENT_REFERENCE,
                    format!("{} is no longer attached", element),
                ));
            }
        }
        Ok(!screen.hidden.contains(element.as_str()))
    }

    async fn is_enabled(&self, element: &ElementId) -> Result<bool> {
        Ok(!self.screen().disabled.contains(element.as_str()))
    }

    async fn press_keycode(&self, keycode: u32) -> Result<()> {
        self.screen().keycodes.push(keycode);
        Ok(())
    }

    async fn is_app_installed(&self, _app_id: &str) -> Result<bool> {
        let (delay, error, installed) = {
            let screen = self.screen();
            (
                screen.install_check_delay,
                screen.install_check_error,
                screen.installed,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if error {
            return Err(Error::webdriver("unknown error", "install check failed"));
        }
        Ok(installed)
    }

    async fn activate_app(&self, app_id: &str) -> Result<()> {
        let mut screen = self.screen();
        screen.activations.push(app_id.to_string());
        if screen.activate_error {
            return Err(Error::webdriver(
                "unknown error",
                format!("Activity not started for {}", app_id),
            ));
        }
        screen.current_package = Some(
            screen
                .foreground_after_activate
                .clone()
                .unwrap_or_else(|| app_id.to_string()),
        );
        Ok(())
    }

    async fn terminate_app(&self, app_id: &str) -> Result<bool> {
        let mut screen = self.screen();
        screen.terminations.push(app_id.to_string());
        let was_running = screen.current_package.as_deref() == Some(app_id);
        if was_running {
            screen.current_package = None;
        }
        Ok(was_running)
    }

    async fn current_package(&self) -> Result<Option<String>> {
        Ok(self.screen().current_package.clone())
    }

    async fn quit(&self) -> Result<()> {
        let mut screen = self.screen();
        screen.quits += 1;
        if screen.quit_error {
            return Err(Error::session("session already gone"));
        }
        Ok(())
    }
}

type DriverBuilder = Arc<dyn Fn(&str) -> FakeDriver + Send + Sync>;

/// Session factory handing out [`FakeDriver`]s
#[derive(Clone, Default)]
pub struct FakeSessionFactory {
    drivers: Arc<Mutex<HashMap<String, FakeDriver>>>,
    builder: Option<DriverBuilder>,
    failing: Arc<Mutex<HashSet<String>>>,
    opened: Arc<Mutex<Vec<String>>>,
    open_delay: Option<Duration>,
}

impl std::fmt::Debug for FakeSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeSessionFactory")
            .field("opened", &self.opened())
            .finish_non_exhaustive()
    }
}

impl FakeSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh driver for every device without a scripted one
    pub fn with_builder(
        mut self,
        builder: impl Fn(&str) -> FakeDriver + Send + Sync + 'static,
    ) -> Self {
        self.builder = Some(Arc::new(builder));
        self
    }

    pub fn with_driver(self, device_id: &str, driver: FakeDriver) -> Self {
        lock(&self.drivers).insert(device_id.to_string(), driver);
        self
    }

    /// Opening a session for `device_id` fails
    pub fn with_failure(self, device_id: &str) -> Self {
        lock(&self.failing).insert(device_id.to_string());
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Driver handed out for `device_id`, if a session was opened
    pub fn driver(&self, device_id: &str) -> Option<FakeDriver> {
        lock(&self.drivers).get(device_id).cloned()
    }

    /// Device ids in the order sessions were requested
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl SessionFactory for FakeSessionFactory {
    type Driver = FakeDriver;

    async fn open(&self, device_id: &str) -> Result<FakeDriver> {
        lock(&self.opened).push(device_id.to_string());

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        if lock(&self.failing).contains(device_id) {
            return Err(Error::session(format!(
                "Could not start a new session for {}: connection refused",
                device_id
            )));
        }

        let mut drivers = lock(&self.drivers);
        let driver = drivers
            .entry(device_id.to_string())
            .or_insert_with(|| match &self.builder {
                Some(builder) => builder(device_id),
                None => FakeDriver::new(),
            })
            .clone();
        Ok(driver)
    }
}

/// Device source with a settable device list
#[derive(Debug, Clone, Default)]
pub struct FakeDeviceSource {
    devices: Arc<Mutex<Vec<Device>>>,
}

impl FakeDeviceSource {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            devices: Arc::new(Mutex::new(test_devices(ids))),
        }
    }

    pub fn set_devices(&self, ids: &[&str]) {
        *lock(&self.devices) = test_devices(ids);
    }
}

impl DeviceSource for FakeDeviceSource {
    async fn list_devices(&self) -> Vec<Device> {
        lock(&self.devices).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
