use std::time::Duration;

use snafu::{ResultExt, Snafu};
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::{ElementQueryable, ElementWaitable};
use thirtyfour::{WebDriver, WebElement};

use crate::locator::Locator;

pub mod urban_routes;

/// How often a wait re-checks its condition.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PageError {
    #[snafu(display("PageError: Could not navigate to '{url}'"))]
    Navigate { url: String, source: WebDriverError },

    #[snafu(display("PageError: Could not find element '{locator}'"))]
    Find {
        locator: Locator,
        source: WebDriverError,
    },

    #[snafu(display("PageError: Could not {action} element '{locator}'"))]
    Interact {
        action: &'static str,
        locator: Locator,
        source: WebDriverError,
    },

    #[snafu(display("PageError: Element '{locator}' did not become {condition} within {timeout:?}"))]
    WaitTimeout {
        condition: &'static str,
        locator: Locator,
        timeout: Duration,
        source: WebDriverError,
    },
}

impl PageError {
    pub fn locator(&self) -> Option<Locator> {
        match self {
            PageError::Navigate { .. } => None,
            PageError::Find { locator, .. }
            | PageError::Interact { locator, .. }
            | PageError::WaitTimeout { locator, .. } => Some(*locator),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::WaitTimeout { .. })
    }
}

/// Primitive element interactions shared by all page objects.
///
/// Every action looks up exactly one element by its locator and does exactly one thing with it.
/// Failures are not retried here.
pub(crate) trait BaseActions {
    fn driver(&self) -> &WebDriver;

    /// Upper bound for explicit waits.
    fn timeout(&self) -> Duration;

    async fn find(&self, locator: Locator) -> Result<WebElement, PageError> {
        self.driver()
            .find(locator.by())
            .await
            .context(FindSnafu { locator })
    }

    async fn type_into(&self, locator: Locator, text: &str) -> Result<(), PageError> {
        tracing::info!("Type into element '{locator}'.");
        let element = self.find(locator).await?;
        element.send_keys(text).await.context(InteractSnafu {
            action: "type into",
            locator,
        })
    }

    async fn click(&self, locator: Locator) -> Result<(), PageError> {
        tracing::info!("Click element '{locator}'.");
        let element = self.find(locator).await?;
        element.click().await.context(InteractSnafu {
            action: "click",
            locator,
        })
    }

    /// Reads a DOM property. A property that is not set reads as the empty string.
    async fn read_property(&self, locator: Locator, name: &str) -> Result<String, PageError> {
        let element = self.find(locator).await?;
        let value = element
            .prop(name.to_owned())
            .await
            .context(InteractSnafu {
                action: "read property of",
                locator,
            })?;
        Ok(value.unwrap_or_default())
    }

    async fn read_text(&self, locator: Locator) -> Result<String, PageError> {
        let element = self.find(locator).await?;
        element.text().await.context(InteractSnafu {
            action: "read text of",
            locator,
        })
    }

    async fn wait_until_visible(&self, locator: Locator) -> Result<WebElement, PageError> {
        let timeout = self.timeout();
        tracing::info!("Wait {timeout:?} for element '{locator}' to become visible.");
        self.driver()
            .query(locator.by())
            .wait(timeout, WAIT_POLL_INTERVAL)
            .and_displayed()
            .first()
            .await
            .context(WaitTimeoutSnafu {
                condition: "visible",
                locator,
                timeout,
            })
    }

    async fn wait_until_clickable(&self, locator: Locator) -> Result<WebElement, PageError> {
        let timeout = self.timeout();
        tracing::info!("Wait {timeout:?} for element '{locator}' to become clickable.");
        let element = self.find(locator).await?;
        element
            .wait_until()
            .wait(timeout, WAIT_POLL_INTERVAL)
            .clickable()
            .await
            .context(WaitTimeoutSnafu {
                condition: "clickable",
                locator,
                timeout,
            })?;
        Ok(element)
    }
}
