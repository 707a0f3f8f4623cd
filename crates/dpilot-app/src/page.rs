//! Generic device page
//!
//! App-independent actions on one automation session: key presses, app
//! install checks, stopping and (re)opening apps, and the dialog/ad
//! dismissal scan. App-specific pages wrap [`DevicePage`].

use dpilot_core::prelude::*;
use dpilot_driver::webdriver::wait::{first_element, is_clickable};
use dpilot_driver::{keycode, Condition, DeviceDriver, ElementId, Locator, Wait};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::config::{BannerSettings, FlowSettings};
use crate::pacing::PauseRange;

/// Timing used by pages and the journey
#[derive(Debug, Clone, PartialEq)]
pub struct PageTiming {
    /// Pause between steps
    pub pause: PauseRange,
    /// Pause between closing the app and going home
    pub close_pause: PauseRange,
    /// Pause after re-opening the app while recovering from a failed step
    pub recovery_pause: PauseRange,
    pub element_timeout: Duration,
    /// Slower install checks count as "not installed"
    pub install_check_timeout: Duration,
    pub launch_settle: Duration,
    pub field_settle: Duration,
    pub results_settle: Duration,
}

impl PageTiming {
    pub fn from_settings(flow: &FlowSettings) -> Result<Self> {
        Ok(Self {
            pause: PauseRange::new(flow.pause_min_secs, flow.pause_max_secs)?,
            close_pause: PauseRange::new(flow.close_pause_min_secs, flow.close_pause_max_secs)?,
            recovery_pause: PauseRange::new(
                flow.recovery_pause_min_secs,
                flow.recovery_pause_max_secs,
            )?,
            element_timeout: Duration::from_secs(flow.element_timeout_secs),
            install_check_timeout: Duration::from_secs(flow.install_check_timeout_secs),
            launch_settle: Duration::from_millis(flow.launch_settle_ms),
            field_settle: Duration::from_millis(flow.field_settle_ms),
            results_settle: Duration::from_millis(flow.results_settle_ms),
        })
    }
}

impl Default for PageTiming {
    fn default() -> Self {
        let flow = FlowSettings::default();
        Self {
            pause: PauseRange::fixed(Duration::from_secs_f64(flow.pause_min_secs)),
            close_pause: PauseRange::fixed(Duration::from_secs_f64(flow.close_pause_min_secs)),
            recovery_pause: PauseRange::fixed(Duration::from_secs_f64(
                flow.recovery_pause_min_secs,
            )),
            element_timeout: Duration::from_secs(flow.element_timeout_secs),
            install_check_timeout: Duration::from_secs(flow.install_check_timeout_secs),
            launch_settle: Duration::from_millis(flow.launch_settle_ms),
            field_settle: Duration::from_millis(flow.field_settle_ms),
            results_settle: Duration::from_millis(flow.results_settle_ms),
        }
    }
}

/// Device-level actions on one session
pub struct DevicePage<'d, D> {
    driver: &'d D,
    timing: &'d PageTiming,
    banners: &'d BannerSettings,
}

impl<'d, D> DevicePage<'d, D>
where
    D: DeviceDriver + Sync,
{
    pub fn new(driver: &'d D, timing: &'d PageTiming, banners: &'d BannerSettings) -> Self {
        Self {
            driver,
            timing,
            banners,
        }
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    pub fn timing(&self) -> &'d PageTiming {
        self.timing
    }

    /// Random pause between steps
    pub async fn pause(&self) {
        self.timing.pause.pause().await;
    }

    pub async fn recovery_pause(&self) {
        self.timing.recovery_pause.pause().await;
    }

    pub fn wait(&self) -> Wait {
        Wait::new(self.timing.element_timeout)
    }

    pub async fn wait_for(&self, locator: &Locator, condition: Condition) -> Result<ElementId> {
        self.wait().until(self.driver, locator, condition).await
    }

    /// Press HOME; failures are logged and swallowed
    pub async fn go_home(&self) {
        info!("Pressing HOME");
        if let Err(e) = self.driver.press_keycode(keycode::HOME).await {
            warn!("Failed to press HOME: {}", e);
        }
    }

    pub async fn press_back(&self) -> Result<()> {
        self.driver.press_keycode(keycode::BACK).await
    }

    /// Install check bounded by `install_check_timeout`
    ///
    /// A check that does not answer in time is treated as "not installed".
    /// A check that fails outright becomes [`Error::AppNotFound`].
    pub async fn check_installed(&self, app_id: &str) -> Result<bool> {
        info!("Checking whether '{}' is installed", app_id);

        match timeout(
            self.timing.install_check_timeout,
            self.driver.is_app_installed(app_id),
        )
        .await
        {
            Ok(Ok(installed)) => {
                info!("Install check for '{}': {}", app_id, installed);
                Ok(installed)
            }
            Ok(Err(e)) => {
                error!("Install check for '{}' failed: {}", app_id, e);
                Err(Error::app_not_found(
                    app_id,
                    Some(format!(
                        "Could not check whether '{}' is installed: {}",
                        app_id, e
                    )),
                ))
            }
            Err(_) => {
                warn!(
                    "Install check for '{}' timed out after {:?}",
                    app_id, self.timing.install_check_timeout
                );
                Ok(false)
            }
        }
    }

    /// Terminate the app whether or not it is in the foreground, then go
    /// home. Never fails.
    pub async fn stop_app_if_opened(&self, app_id: &str) {
        match self.driver.current_package().await {
            Ok(Some(current)) if current == app_id => {
                info!("'{}' is in the foreground, closing it", app_id);
            }
            Ok(Some(current)) => {
                debug!(
                    "'{}' not in the foreground (current: {}), closing anyway",
                    app_id, current
                );
            }
            Ok(None) => debug!("Foreground package unknown, closing '{}' anyway", app_id),
            Err(e) => warn!("Could not read the foreground package: {}", e),
        }

        self.close_app_and_go_home(app_id).await;
    }

    async fn close_app_and_go_home(&self, app_id: &str) {
        match self.driver.terminate_app(app_id).await {
            Ok(was_running) => info!("Closed '{}' (was running: {})", app_id, was_running),
            Err(e) => {
                debug!("Could not close '{}' (may not be open): {}", app_id, e);
                return;
            }
        }
        self.timing.close_pause.pause().await;
        self.go_home().await;
    }

    /// Install check, stop, activate, and confirm the foreground package
    ///
    /// Missing or unlaunchable apps fail with [`Error::AppNotFound`]. A
    /// foreground mismatch is retried once and then only logged.
    pub async fn open_app(&self, app_id: &str) -> Result<()> {
        info!("Opening '{}'", app_id);

        if !self.check_installed(app_id).await? {
            error!("'{}' is not installed", app_id);
            return Err(Error::app_not_found(
                app_id,
                Some(format!("The app '{}' is not installed", app_id)),
            ));
        }

        self.stop_app_if_opened(app_id).await;
        self.pause().await;

        info!("Activating '{}'", app_id);
        self.driver.activate_app(app_id).await.map_err(|e| {
            error!("Activating '{}' failed: {}", app_id, e);
            Error::app_not_found(
                app_id,
                Some(format!("Could not activate '{}': {}", app_id, e)),
            )
        })?;

        sleep(self.timing.launch_settle).await;
        self.confirm_foreground(app_id).await;

        info!("'{}' is open", app_id);
        Ok(())
    }

    async fn confirm_foreground(&self, app_id: &str) {
        match self.driver.current_package().await {
            Ok(Some(current)) if current == app_id => {
                debug!("Foreground package confirmed: {}", current);
                return;
            }
            Ok(None) => {
                warn!("Foreground package unknown, assuming '{}' is active", app_id);
                return;
            }
            Err(e) => {
                warn!("Could not verify the foreground package: {}", e);
                return;
            }
            Ok(Some(current)) => {
                warn!(
                    "Foreground package is {} instead of {}, activating again",
                    current, app_id
                );
            }
        }

        match self.driver.activate_app(app_id).await {
            Ok(()) => sleep(self.timing.launch_settle).await,
            Err(e) => warn!("Second activation of '{}' failed: {}", app_id, e),
        }

        match self.driver.current_package().await {
            Ok(Some(current)) if current == app_id => {
                info!("'{}' in the foreground after second activation", app_id)
            }
            Ok(Some(current)) => warn!(
                "Foreground package still {}, continuing with '{}'",
                current, app_id
            ),
            Ok(None) => warn!("Foreground package unknown after second activation"),
            Err(e) => warn!("Could not verify the foreground package: {}", e),
        }
    }

    /// Tap through known dialogs and close advertisements
    ///
    /// Stops after `max_iterations` rounds, after `max_total_secs`, or after
    /// a round that handled nothing. Returns whether anything was handled.
    pub async fn dismiss_banners(&self) -> bool {
        let start = Instant::now();
        let deadline = start + self.banners.max_total();
        let mut handled_any = false;

        debug!(
            "Scanning for dialogs and banners ({} rounds, {:?} budget)",
            self.banners.max_iterations,
            self.banners.max_total()
        );

        for round in 1..=self.banners.max_iterations {
            if Instant::now() >= deadline {
                warn!("Banner scan budget exhausted after {} round(s)", round - 1);
                break;
            }

            let handled = self.tap_dismiss_text(deadline).await
                || self.close_advertisement(deadline).await;

            if !handled {
                trace!("Nothing to dismiss in round {}", round);
                break;
            }
            handled_any = true;
        }

        debug!(
            "Banner scan finished in {:.1}s (handled: {})",
            start.elapsed().as_secs_f64(),
            handled_any
        );
        handled_any
    }

    async fn tap_dismiss_text(&self, deadline: Instant) -> bool {
        for text in &self.banners.dismiss_texts {
            if Instant::now() >= deadline {
                return false;
            }

            let locator = Locator::text_or_description(text);
            let element = match first_element(self.driver, &locator).await {
                Ok(Some(element)) => element,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Lookup for '{}' failed: {}", text, e);
                    continue;
                }
            };

            if !is_clickable(self.driver, &element).await {
                continue;
            }

            match self.driver.click(&element).await {
                Ok(()) => {
                    info!("Tapped '{}'", text);
                    return true;
                }
                Err(e) => debug!("Tapping '{}' failed: {}", text, e),
            }
        }
        false
    }

    async fn close_advertisement(&self, deadline: Instant) -> bool {
        for keyword in &self.banners.ad_keywords {
            if Instant::now() >= deadline {
                return false;
            }

            let ads = match self
                .driver
                .find_elements(&Locator::containing_text(keyword))
                .await
            {
                Ok(ads) => ads,
                Err(e) => {
                    debug!("Lookup for '{}' failed: {}", keyword, e);
                    continue;
                }
            };

            for ad in ads {
                if Instant::now() >= deadline {
                    return false;
                }
                if !is_clickable(self.driver, &ad).await {
                    continue;
                }

                info!("Found '{}', trying to close it", keyword);
                if self.tap_close_button(&ad).await {
                    return true;
                }

                info!("No close button, pressing BACK");
                if let Err(e) = self.press_back().await {
                    warn!("Pressing BACK failed: {}", e);
                }
                return true;
            }
        }
        false
    }

    async fn tap_close_button(&self, ad: &ElementId) -> bool {
        for close_text in &self.banners.close_texts {
            let locator = Locator::descendant_text_or_description(close_text);
            let Ok(buttons) = self.driver.find_child_elements(ad, &locator).await else {
                continue;
            };
            let Some(button) = buttons.into_iter().next() else {
                continue;
            };
            if !self.driver.is_displayed(&button).await.unwrap_or(false) {
                continue;
            }
            if self.driver.click(&button).await.is_ok() {
                info!("Closed advertisement with '{}'", close_text);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpilot_driver::test_utils::FakeDriver;

    const PKG: &str = "com.spotify.music";

    fn page<'d>(
        driver: &'d FakeDriver,
        timing: &'d PageTiming,
        banners: &'d BannerSettings,
    ) -> DevicePage<'d, FakeDriver> {
        DevicePage::new(driver, timing, banners)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_app_happy_path() {
        let driver = FakeDriver::new().with_current_package(PKG);
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        page(&driver, &timing, &banners).open_app(PKG).await.unwrap();

        // Stop-if-running closed it first, then it was activated once
        assert_eq!(driver.terminations(), vec![PKG]);
        assert_eq!(driver.activations(), vec![PKG]);
        assert_eq!(driver.keycodes(), vec![keycode::HOME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_app_not_installed() {
        let driver = FakeDriver::new().with_installed(false);
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        let err = page(&driver, &timing, &banners)
            .open_app(PKG)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AppNotFound { ref app_id, .. } if app_id == PKG));
        assert!(err.to_string().contains("is not installed"));
        assert!(driver.activations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_install_check_counts_as_not_installed() {
        let driver = FakeDriver::new().with_install_check_delay(Duration::from_secs(3600));
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());
        let start = Instant::now();

        let installed = page(&driver, &timing, &banners)
            .check_installed(PKG)
            .await
            .unwrap();

        assert!(!installed);
        assert!(start.elapsed() >= timing.install_check_timeout);
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_install_check_is_app_not_found() {
        let driver = FakeDriver::new().with_install_check_error();
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        let err = page(&driver, &timing, &banners)
            .open_app(PKG)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AppNotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_failure_is_app_not_found() {
        let driver = FakeDriver::new().with_activate_error();
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        let err = page(&driver, &timing, &banners)
            .open_app(PKG)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("[APP_NOT_FOUND]: Could not activate"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreground_mismatch_retries_once_and_continues() {
        let driver = FakeDriver::new().with_foreground_after_activate("com.android.launcher");
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        page(&driver, &timing, &banners).open_app(PKG).await.unwrap();

        assert_eq!(driver.activations(), vec![PKG, PKG]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_app_if_opened_always_terminates() {
        let driver = FakeDriver::new().with_current_package("com.other");
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        page(&driver, &timing, &banners).stop_app_if_opened(PKG).await;

        assert_eq!(driver.terminations(), vec![PKG]);
        assert_eq!(driver.keycodes(), vec![keycode::HOME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_uses_its_own_pause() {
        let driver = FakeDriver::new().with_current_package(PKG);
        let timing = PageTiming {
            pause: PauseRange::fixed(Duration::from_secs(20)),
            close_pause: PauseRange::fixed(Duration::from_secs(4)),
            ..PageTiming::default()
        };
        let banners = BannerSettings::default();
        let start = Instant::now();

        page(&driver, &timing, &banners).stop_app_if_opened(PKG).await;

        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(driver.keycodes(), vec![keycode::HOME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_banners_taps_until_clear() {
        let continue_btn = Locator::text_or_description("Continue");
        let allow_btn = Locator::text_or_description("Allow");
        let driver = FakeDriver::new()
            .with_elements(&continue_btn, ["continue"])
            .with_dismissable("continue")
            .with_elements(&allow_btn, ["allow"])
            .with_dismissable("allow");
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        let handled = page(&driver, &timing, &banners).dismiss_banners().await;

        assert!(handled);
        assert_eq!(driver.clicks(), vec!["continue", "allow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_banners_skips_hidden_buttons() {
        let continue_btn = Locator::text_or_description("Continue");
        let driver = FakeDriver::new()
            .with_elements(&continue_btn, ["continue"])
            .with_hidden("continue");
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        assert!(!page(&driver, &timing, &banners).dismiss_banners().await);
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_banners_bounded_by_iterations() {
        // Never disappears, so every round handles it again
        let continue_btn = Locator::text_or_description("Continue");
        let driver = FakeDriver::new().with_elements(&continue_btn, ["stuck"]);
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        assert!(page(&driver, &timing, &banners).dismiss_banners().await);
        assert_eq!(driver.clicks().len(), banners.max_iterations as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertisement_closed_with_button() {
        let ad = Locator::containing_text("Advertisement");
        let close = Locator::descendant_text_or_description("Close");
        let driver = FakeDriver::new()
            .with_elements(&ad, ["ad"])
            .with_children("ad", &close, ["close-btn"]);
        let banners = BannerSettings {
            max_iterations: 1,
            ..BannerSettings::default()
        };
        let timing = PageTiming::default();

        let handled = page(&driver, &timing, &banners).dismiss_banners().await;

        assert!(handled);
        assert_eq!(driver.clicks(), vec!["close-btn"]);
        assert!(driver.keycodes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertisement_without_close_button_presses_back() {
        let ad = Locator::containing_text("Advertisement");
        let driver = FakeDriver::new().with_elements(&ad, ["ad"]);
        let banners = BannerSettings {
            max_iterations: 1,
            ..BannerSettings::default()
        };
        let timing = PageTiming::default();

        assert!(page(&driver, &timing, &banners).dismiss_banners().await);
        assert_eq!(driver.keycodes(), vec![keycode::BACK]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_scan_survives_lookup_errors() {
        let driver = FakeDriver::new().with_failing_lookups();
        let (timing, banners) = (PageTiming::default(), BannerSettings::default());

        assert!(!page(&driver, &timing, &banners).dismiss_banners().await);
    }

    #[test]
    fn test_timing_from_settings_validates_ranges() {
        let flow = FlowSettings {
            pause_min_secs: 3.0,
            pause_max_secs: 1.0,
            ..FlowSettings::default()
        };
        assert!(PageTiming::from_settings(&flow).is_err());

        let timing = PageTiming::from_settings(&FlowSettings::default()).unwrap();
        assert_eq!(timing.close_pause.min(), Duration::from_secs(3));
        assert_eq!(timing.close_pause.max(), Duration::from_secs(5));

        let timing = PageTiming::from_settings(&FlowSettings::default()).unwrap();
        assert_eq!(timing.element_timeout, Duration::from_secs(30));
        assert_eq!(timing.launch_settle, Duration::from_secs(3));
    }
}
