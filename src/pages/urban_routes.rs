use std::time::Duration;

use snafu::ResultExt;
use thirtyfour::WebDriver;
use url::Url;

use crate::config::CardDetails;
use crate::locator::Locator;
use crate::pages::{BaseActions, InteractSnafu, NavigateSnafu, PageError};

/// The single page of the Urban Routes app on which a taxi is booked.
pub struct UrbanRoutesPage<'d> {
    pub driver: &'d WebDriver,

    pub timeout: Duration,
}

impl BaseActions for UrbanRoutesPage<'_> {
    fn driver(&self) -> &WebDriver {
        self.driver
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<'d> UrbanRoutesPage<'d> {
    pub const FROM_FIELD: Locator = Locator::id("from");
    pub const TO_FIELD: Locator = Locator::id("to");
    pub const COMFORT_FARE_BUTTON: Locator = Locator::id("comfort-fare");
    pub const PHONE_FIELD: Locator = Locator::id("phone");
    pub const CARD_NUMBER_FIELD: Locator = Locator::id("card-number");
    pub const CARD_EXPIRATION_FIELD: Locator = Locator::id("expiration-date");
    pub const CARD_CODE_FIELD: Locator = Locator::id("code");
    pub const LINK_CARD_BUTTON: Locator = Locator::id("link");
    pub const DRIVER_MESSAGE_FIELD: Locator = Locator::id("controller-message");
    pub const BLANKET_CHECKBOX: Locator = Locator::id("blanket");
    pub const TISSUES_CHECKBOX: Locator = Locator::id("tissues");
    pub const ICE_CREAM_BUTTON: Locator = Locator::id("ice-cream");
    pub const TAXI_SEARCH_MODAL: Locator = Locator::id("taxi-search-modal");
    pub const DRIVER_INFO_MODAL: Locator = Locator::id("driver-info-modal");
    pub const PAGE_BODY: Locator = Locator::tag_name("body");

    /// One entry per UI field this page interacts with.
    pub const LOCATORS: [Locator; 15] = [
        Self::FROM_FIELD,
        Self::TO_FIELD,
        Self::COMFORT_FARE_BUTTON,
        Self::PHONE_FIELD,
        Self::CARD_NUMBER_FIELD,
        Self::CARD_EXPIRATION_FIELD,
        Self::CARD_CODE_FIELD,
        Self::LINK_CARD_BUTTON,
        Self::DRIVER_MESSAGE_FIELD,
        Self::BLANKET_CHECKBOX,
        Self::TISSUES_CHECKBOX,
        Self::ICE_CREAM_BUTTON,
        Self::TAXI_SEARCH_MODAL,
        Self::DRIVER_INFO_MODAL,
        Self::PAGE_BODY,
    ];

    /// Uses the default wait timeout of 10 seconds.
    pub fn new(driver: &'d WebDriver) -> Self {
        Self {
            driver,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn goto(&self, url: &Url) -> Result<(), PageError> {
        tracing::info!("Navigating to {url}...");
        self.driver
            .goto(url.as_str())
            .await
            .context(NavigateSnafu { url: url.as_str() })
    }

    pub async fn set_from(&self, address: &str) -> Result<(), PageError> {
        self.type_into(Self::FROM_FIELD, address).await
    }

    pub async fn set_to(&self, address: &str) -> Result<(), PageError> {
        self.type_into(Self::TO_FIELD, address).await
    }

    pub async fn get_from(&self) -> Result<String, PageError> {
        self.read_property(Self::FROM_FIELD, "value").await
    }

    pub async fn get_to(&self) -> Result<String, PageError> {
        self.read_property(Self::TO_FIELD, "value").await
    }

    pub async fn select_comfort_fare(&self) -> Result<(), PageError> {
        self.click(Self::COMFORT_FARE_BUTTON).await
    }

    pub async fn set_phone_number(&self, phone_number: &str) -> Result<(), PageError> {
        self.type_into(Self::PHONE_FIELD, phone_number).await
    }

    /// Fills the payment form and links the card.
    ///
    /// The `link` button only activates once the CVV field lost focus, so the page body is clicked
    /// before waiting for it.
    pub async fn add_credit_card(&self, card: &CardDetails) -> Result<(), PageError> {
        self.type_into(Self::CARD_NUMBER_FIELD, &card.number).await?;
        self.type_into(Self::CARD_EXPIRATION_FIELD, &card.expiration)
            .await?;
        self.type_into(Self::CARD_CODE_FIELD, &card.code).await?;
        self.click(Self::PAGE_BODY).await?;

        let link = self.wait_until_clickable(Self::LINK_CARD_BUTTON).await?;
        tracing::info!("Click element '{}'.", Self::LINK_CARD_BUTTON);
        link.click().await.context(InteractSnafu {
            action: "click",
            locator: Self::LINK_CARD_BUTTON,
        })
    }

    pub async fn write_controller_message(&self, message: &str) -> Result<(), PageError> {
        self.type_into(Self::DRIVER_MESSAGE_FIELD, message).await
    }

    pub async fn request_blanket_and_tissues(&self) -> Result<(), PageError> {
        self.click(Self::BLANKET_CHECKBOX).await?;
        self.click(Self::TISSUES_CHECKBOX).await
    }

    /// Clicks the ice-cream control exactly `quantity` times.
    pub async fn request_ice_creams(&self, quantity: u32) -> Result<(), PageError> {
        for _ in 0..quantity {
            self.click(Self::ICE_CREAM_BUTTON).await?;
        }
        Ok(())
    }

    pub async fn wait_for_taxi_modal(&self) -> Result<(), PageError> {
        self.wait_until_visible(Self::TAXI_SEARCH_MODAL).await?;
        Ok(())
    }

    pub async fn wait_for_driver_info(&self) -> Result<(), PageError> {
        self.wait_until_visible(Self::DRIVER_INFO_MODAL).await?;
        Ok(())
    }

    /// Text content of any element on this page. Mostly useful for assertions in tests.
    pub async fn text_of(&self, locator: Locator) -> Result<String, PageError> {
        self.read_text(locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn locators_map_one_to_one_to_fields() {
        let mut seen = HashSet::new();
        for locator in UrbanRoutesPage::LOCATORS {
            assert_that(seen.insert(locator))
                .with_detail_message(format!("Locator '{locator}' is used for two fields."))
                .is_true();
        }
    }

    #[test]
    fn address_fields_are_located_by_id() {
        assert_that(UrbanRoutesPage::FROM_FIELD.to_string()).is_equal_to("id=from");
        assert_that(UrbanRoutesPage::TO_FIELD.to_string()).is_equal_to("id=to");
    }
}
