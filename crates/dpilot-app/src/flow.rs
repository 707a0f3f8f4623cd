//! The scripted user journey run on each device
//!
//! [`ArtistJourney`]: open the app, search for an artist, open the verified
//! result and start playback. The executor only knows the [`Journey`] trait.

use dpilot_core::prelude::*;
use dpilot_driver::DeviceDriver;
use std::future::Future;

use crate::config::{BannerSettings, Settings};
use crate::music::MusicAppPage;
use crate::page::{DevicePage, PageTiming};

/// Per-run parameters chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowParams {
    pub artist: String,
}

impl FlowParams {
    pub fn new(artist: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
        }
    }
}

/// A script driven through one open session
pub trait Journey: Send + Sync + 'static {
    fn run<D>(&self, driver: &D, params: &FlowParams) -> impl Future<Output = Result<()>> + Send
    where
        D: DeviceDriver + Sync;
}

/// Search an artist, open the verified result, press play
#[derive(Debug, Clone)]
pub struct ArtistJourney {
    package: String,
    timing: PageTiming,
    banners: BannerSettings,
}

impl ArtistJourney {
    pub fn new(package: impl Into<String>, timing: PageTiming, banners: BannerSettings) -> Self {
        Self {
            package: package.into(),
            timing,
            banners,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            settings.app.package.clone(),
            PageTiming::from_settings(&settings.flow)?,
            settings.banners.clone(),
        ))
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    async fn navigate<D>(&self, page: &MusicAppPage<'_, D>, artist: &str) -> Result<()>
    where
        D: DeviceDriver + Sync,
    {
        page.open_search().await?;

        page.device().pause().await;
        page.search(artist).await?;

        let row = page
            .verified_result()
            .await?
            .ok_or_else(|| Error::element_not_found(format!("verified result for '{}'", artist)))?;
        page.device().driver().click(&row).await?;

        page.device().pause().await;
        page.play_artist().await
    }

    /// A step failed: if the app left the foreground, re-open it once, then
    /// report the step failure as [`Error::AppNotFound`]
    async fn recover<D>(&self, page: &MusicAppPage<'_, D>, cause: Error) -> Error
    where
        D: DeviceDriver + Sync,
    {
        error!("Journey step failed: {}", cause);

        if cause.is_element_timeout() {
            match page.device().driver().current_package().await {
                Ok(current) if current.as_deref() != Some(self.package.as_str()) => {
                    warn!(
                        "'{}' not in the foreground ({:?}), opening it again",
                        self.package, current
                    );
                    if let Err(e) = page.device().open_app(&self.package).await {
                        error!("Re-opening '{}' failed: {}", self.package, e);
                        return e;
                    }
                    page.device().recovery_pause().await;
                }
                Ok(_) => debug!("'{}' still in the foreground", self.package),
                Err(e) => warn!("Could not read the foreground package: {}", e),
            }
        }

        match cause {
            Error::AppNotFound { .. } => cause,
            other => Error::app_not_found(&self.package, Some(other.to_string())),
        }
    }
}

impl Journey for ArtistJourney {
    async fn run<D>(&self, driver: &D, params: &FlowParams) -> Result<()>
    where
        D: DeviceDriver + Sync,
    {
        let device = DevicePage::new(driver, &self.timing, &self.banners);
        let page = MusicAppPage::new(device, &self.package);

        info!("Starting journey for '{}'", params.artist);
        page.device().pause().await;

        page.open().await?;

        if let Err(cause) = self.navigate(&page, &params.artist).await {
            return Err(self.recover(&page, cause).await);
        }

        info!("Journey completed for '{}'", params.artist);
        Ok(())
    }
}
