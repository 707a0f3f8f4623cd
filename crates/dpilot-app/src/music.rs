//! Music app page: search, pick the verified artist, play

use dpilot_core::prelude::*;
use dpilot_driver::{Condition, DeviceDriver, ElementId, Locator};
use tokio::time::sleep;

use crate::page::DevicePage;

/// Element locators of the music app's UI
pub mod locators {
    use dpilot_driver::Locator;

    pub const SEARCH_TAB_XPATH: &str = "//android.view.ViewGroup[@resource-id='com.spotify.music:id/navigation_bar']/android.view.View/android.view.View[2]/android.view.View[2]";
    pub const SEARCH_TAB_ID: &str = "com.spotify.music:id/button_search";
    pub const SEARCH_BAR_XPATH: &str = "//androidx.compose.ui.platform.ComposeView[@resource-id='com.spotify.music:id/browse_search_bar_container']/android.view.View/android.view.View";
    pub const QUERY_FIELD_XPATH: &str =
        "//android.widget.EditText[@resource-id='com.spotify.music:id/query']";
    pub const RESULTS_XPATH: &str = "//androidx.recyclerview.widget.RecyclerView[@resource-id='com.spotify.music:id/search_content_recyclerview']";
    pub const RESULT_ROW_XPATH: &str =
        ".//android.view.ViewGroup[@resource-id='com.spotify.music:id/row_root']";
    pub const VERIFIED_BADGE_XPATH: &str =
        ".//android.widget.ImageView[@content-desc='Verified']";
    pub const PLAY_BUTTON_ID: &str = "com.spotify.music:id/button_play_and_pause";

    pub fn search_tab() -> Locator {
        Locator::xpath(SEARCH_TAB_XPATH)
    }

    pub fn search_tab_fallback() -> Locator {
        Locator::id(SEARCH_TAB_ID)
    }

    pub fn search_bar() -> Locator {
        Locator::xpath(SEARCH_BAR_XPATH)
    }

    pub fn query_field() -> Locator {
        Locator::xpath(QUERY_FIELD_XPATH)
    }

    pub fn results() -> Locator {
        Locator::xpath(RESULTS_XPATH)
    }

    pub fn result_row() -> Locator {
        Locator::xpath(RESULT_ROW_XPATH)
    }

    pub fn verified_badge() -> Locator {
        Locator::xpath(VERIFIED_BADGE_XPATH)
    }

    pub fn play_button() -> Locator {
        Locator::id(PLAY_BUTTON_ID)
    }
}

/// The music app, on top of the generic device page
pub struct MusicAppPage<'d, D> {
    page: DevicePage<'d, D>,
    package: &'d str,
}

impl<'d, D> MusicAppPage<'d, D>
where
    D: DeviceDriver + Sync,
{
    pub fn new(page: DevicePage<'d, D>, package: &'d str) -> Self {
        Self { page, package }
    }

    pub fn device(&self) -> &DevicePage<'d, D> {
        &self.page
    }

    pub fn package(&self) -> &'d str {
        self.package
    }

    /// Open the app fresh and clear any start-up dialogs
    pub async fn open(&self) -> Result<()> {
        self.page.open_app(self.package).await?;
        self.page.pause().await;
        self.page.dismiss_banners().await;
        Ok(())
    }

    /// Search tab, by its navigation bar position or else by resource id
    pub async fn search_tab(&self) -> Result<ElementId> {
        debug!("Looking for the search tab");
        match self
            .page
            .wait_for(&locators::search_tab(), Condition::Present)
            .await
        {
            Ok(tab) => Ok(tab),
            Err(e) if e.is_element_timeout() => {
                debug!("Search tab not found by position, trying resource id");
                self.page
                    .wait_for(&locators::search_tab_fallback(), Condition::Present)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn open_search(&self) -> Result<()> {
        let tab = self.search_tab().await?;
        self.page.pause().await;
        self.page.driver().click(&tab).await
    }

    /// Focus the search bar and return the text field
    async fn search_field(&self) -> Result<ElementId> {
        let container = self
            .page
            .wait_for(&locators::search_bar(), Condition::Clickable)
            .await?;
        self.page.driver().click(&container).await?;

        // Keyboard animation
        sleep(self.page.timing().field_settle).await;

        self.page
            .wait_for(&locators::query_field(), Condition::Clickable)
            .await
    }

    /// Type the query and give the results time to load
    pub async fn search(&self, text: &str) -> Result<()> {
        let field = self.search_field().await?;
        self.page.driver().send_keys(&field, text).await?;
        info!("Searched for '{}'", text);

        sleep(self.page.timing().results_settle).await;
        Ok(())
    }

    /// First result row carrying the verified badge
    ///
    /// Rows are scanned in order; a failed badge lookup counts as "no badge".
    pub async fn verified_result(&self) -> Result<Option<ElementId>> {
        let results = self
            .page
            .wait_for(&locators::results(), Condition::Present)
            .await?;
        let rows = self
            .page
            .driver()
            .find_child_elements(&results, &locators::result_row())
            .await?;
        debug!("{} result row(s)", rows.len());

        let badge = locators::verified_badge();
        for (index, row) in rows.into_iter().enumerate() {
            let badges = self
                .page
                .driver()
                .find_child_elements(&row, &badge)
                .await
                .unwrap_or_default();
            if !badges.is_empty() {
                info!("Verified result at position {}", index + 1);
                return Ok(Some(row));
            }
        }

        warn!("No verified result");
        Ok(None)
    }

    pub async fn play_artist(&self) -> Result<()> {
        let button = self
            .page
            .wait_for(&locators::play_button(), Condition::Clickable)
            .await?;
        self.page.driver().click(&button).await?;
        info!("Tapped play");
        Ok(())
    }
}
