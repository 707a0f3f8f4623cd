//! Polling waits for elements

use dpilot_core::prelude::*;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::driver::{DeviceDriver, ElementId};
use super::locator::Locator;
use super::protocol::STALE_ELEMENT_REFERENCE;

/// Default poll interval between lookups
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the first matching element must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Present in the view hierarchy
    Present,
    /// Displayed and enabled
    Clickable,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Present => f.write_str("present"),
            Condition::Clickable => f.write_str("clickable"),
        }
    }
}

/// Explicit wait: poll until a condition holds or the timeout runs out
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// First element matching `locator` that satisfies `condition`
    ///
    /// Always checks at least once, even with a zero timeout. A stale element
    /// counts as "not yet"; other lookup errors end the wait immediately.
    pub async fn until<D>(
        &self,
        driver: &D,
        locator: &Locator,
        condition: Condition,
    ) -> Result<ElementId>
    where
        D: DeviceDriver + Sync,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            let elements = driver.find_elements(locator).await?;
            if let Some(element) = elements.into_iter().next() {
                if satisfies(driver, &element, condition).await? {
                    return Ok(element);
                }
            }

            if Instant::now() >= deadline {
                debug!("Gave up waiting for {} to be {}", locator, condition);
                return Err(Error::timeout(format!("{} to be {}", locator, condition)));
            }

            sleep(self.poll_interval).await;
        }
    }
}

async fn satisfies<D>(driver: &D, element: &ElementId, condition: Condition) -> Result<bool>
where
    D: DeviceDriver + Sync,
{
    match condition {
        Condition::Present => Ok(true),
        Condition::Clickable => {
            let clickable = async {
                let displayed = driver.is_displayed(element).await?;
                Ok::<_, Error>(displayed && driver.is_enabled(element).await?)
            };
            match clickable.await {
                Err(Error::WebDriver { kind, .. }) if kind == STALE_ELEMENT_REFERENCE => {
                    debug!("{} went stale, looking it up again", element);
                    Ok(false)
                }
                other => other,
            }
        }
    }
}

/// First element matching `locator` right now, without waiting
pub async fn first_element<D>(driver: &D, locator: &Locator) -> Result<Option<ElementId>>
where
    D: DeviceDriver + Sync,
{
    Ok(driver.find_elements(locator).await?.into_iter().next())
}

/// Whether an element can be tapped right now; lookup errors count as no
pub async fn is_clickable<D>(driver: &D, element: &ElementId) -> bool
where
    D: DeviceDriver + Sync,
{
    satisfies(driver, element, Condition::Clickable)
        .await
        .unwrap_or(false)
}
