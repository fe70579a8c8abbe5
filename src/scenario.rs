use std::fmt::{Display, Formatter};
use std::future::Future;

use snafu::ResultExt;
use thirtyfour::WebDriver;

use crate::config::ScenarioConfig;
use crate::error::{
    AddressMismatchSnafu, PhoneCodeSnafu, ScenarioError, SessionSnafu, StepSnafu,
};
use crate::pages::PageError;
use crate::pages::urban_routes::UrbanRoutesPage;
use crate::phone_code::{self, VerificationCode};
use crate::session::{BrowserSession, SessionError};

/// One step of the booking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStep {
    SetRoute,
    SelectComfortFare,
    EnterPhoneNumber,
    /// Optional, only run when enabled in the config.
    RetrievePhoneCode,
    AddCreditCard,
    WriteDriverMessage,
    RequestBlanketAndTissues,
    RequestIceCreams,
    WaitForTaxiSearch,
    WaitForDriverInfo,
}

impl BookingStep {
    /// The mandatory steps, in execution order.
    pub const SEQUENCE: [BookingStep; 9] = [
        BookingStep::SetRoute,
        BookingStep::SelectComfortFare,
        BookingStep::EnterPhoneNumber,
        BookingStep::AddCreditCard,
        BookingStep::WriteDriverMessage,
        BookingStep::RequestBlanketAndTissues,
        BookingStep::RequestIceCreams,
        BookingStep::WaitForTaxiSearch,
        BookingStep::WaitForDriverInfo,
    ];

    /// 1-based position in the flow. The optional code retrieval shares the phone step's number.
    pub fn ordinal(self) -> u8 {
        match self {
            BookingStep::SetRoute => 1,
            BookingStep::SelectComfortFare => 2,
            BookingStep::EnterPhoneNumber | BookingStep::RetrievePhoneCode => 3,
            BookingStep::AddCreditCard => 4,
            BookingStep::WriteDriverMessage => 5,
            BookingStep::RequestBlanketAndTissues => 6,
            BookingStep::RequestIceCreams => 7,
            BookingStep::WaitForTaxiSearch => 8,
            BookingStep::WaitForDriverInfo => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BookingStep::SetRoute => "set route",
            BookingStep::SelectComfortFare => "select comfort fare",
            BookingStep::EnterPhoneNumber => "enter phone number",
            BookingStep::RetrievePhoneCode => "retrieve phone code",
            BookingStep::AddCreditCard => "add credit card",
            BookingStep::WriteDriverMessage => "write driver message",
            BookingStep::RequestBlanketAndTissues => "request blanket and tissues",
            BookingStep::RequestIceCreams => "request ice creams",
            BookingStep::WaitForTaxiSearch => "wait for taxi search",
            BookingStep::WaitForDriverInfo => "wait for driver info",
        }
    }
}

impl Display for BookingStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    From,
    To,
}

impl Display for AddressField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressField::From => f.write_str("from"),
            AddressField::To => f.write_str("to"),
        }
    }
}

/// What a successful run went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingOutcome {
    pub completed: Vec<BookingStep>,

    /// Set when phone code retrieval was enabled.
    pub phone_code: Option<VerificationCode>,
}

/// Runs the fixed booking flow described by a [`ScenarioConfig`].
pub struct BookingScenario<'c> {
    config: &'c ScenarioConfig,
}

impl<'c> BookingScenario<'c> {
    pub fn new(config: &'c ScenarioConfig) -> Self {
        Self { config }
    }

    /// Starts a browser session, books a taxi and quits the session again.
    ///
    /// The session is quit even if a step failed. In that case the step's error is returned and a
    /// failure to quit is only logged.
    pub async fn run(&self) -> Result<BookingOutcome, ScenarioError> {
        let session = BrowserSession::start(&self.config.session)
            .await
            .context(SessionSnafu {})?;

        let result = self.run_steps(session.driver()).await;
        let quit = session.quit().await;

        settle(result, quit)
    }

    /// Books a taxi using an already established session. Stops at the first failure.
    pub async fn run_steps(&self, driver: &WebDriver) -> Result<BookingOutcome, ScenarioError> {
        let trip = &self.config.trip;
        let page = UrbanRoutesPage::new(driver).with_timeout(self.config.ui_timeout);
        let mut outcome = BookingOutcome::default();
        let completed = &mut outcome.completed;

        // Only counts as completed once both addresses read back as entered.
        let step = BookingStep::SetRoute;
        tracing::info!("Step {}: {step}.", step.ordinal());
        let (from, to) = async {
            page.goto(&self.config.url).await?;
            page.set_from(&trip.address_from).await?;
            page.set_to(&trip.address_to).await?;
            Ok::<_, PageError>((page.get_from().await?, page.get_to().await?))
        }
        .await
        .context(StepSnafu { step })?;
        expect_address(AddressField::From, &trip.address_from, from)?;
        expect_address(AddressField::To, &trip.address_to, to)?;
        completed.push(step);

        perform(completed, BookingStep::SelectComfortFare, page.select_comfort_fare()).await?;

        perform(
            completed,
            BookingStep::EnterPhoneNumber,
            page.set_phone_number(&trip.phone_number),
        )
        .await?;

        if self.config.retrieve_phone_code {
            let step = BookingStep::RetrievePhoneCode;
            tracing::info!("Step {}: {step}.", step.ordinal());
            let code = phone_code::retrieve_phone_code(driver, &self.config.phone_code)
                .await
                .context(PhoneCodeSnafu {})?;
            tracing::info!(%code, "Retrieved phone confirmation code.");
            completed.push(step);
            outcome.phone_code = Some(code);
        }

        perform(completed, BookingStep::AddCreditCard, page.add_credit_card(&trip.card)).await?;

        perform(
            completed,
            BookingStep::WriteDriverMessage,
            page.write_controller_message(&trip.driver_message),
        )
        .await?;

        perform(
            completed,
            BookingStep::RequestBlanketAndTissues,
            page.request_blanket_and_tissues(),
        )
        .await?;

        perform(
            completed,
            BookingStep::RequestIceCreams,
            page.request_ice_creams(trip.ice_creams),
        )
        .await?;

        perform(completed, BookingStep::WaitForTaxiSearch, page.wait_for_taxi_modal()).await?;

        perform(completed, BookingStep::WaitForDriverInfo, page.wait_for_driver_info()).await?;

        tracing::info!("Booking flow completed.");
        Ok(outcome)
    }
}

/// Combines the result of a run with the result of quitting its session.
///
/// A step error takes precedence over a failure to quit, which is then only logged.
fn settle(
    result: Result<BookingOutcome, ScenarioError>,
    quit: Result<(), SessionError>,
) -> Result<BookingOutcome, ScenarioError> {
    match (result, quit) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_outcome), Err(quit_err)) => Err(quit_err).context(SessionSnafu {}),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(quit_err)) => {
            tracing::warn!(?quit_err, "Could not quit browser session after failed run.");
            Err(err)
        }
    }
}

async fn perform<T>(
    completed: &mut Vec<BookingStep>,
    step: BookingStep,
    action: impl Future<Output = Result<T, PageError>>,
) -> Result<T, ScenarioError> {
    tracing::info!("Step {}: {step}.", step.ordinal());
    let value = action.await.context(StepSnafu { step })?;
    completed.push(step);
    Ok(value)
}

fn expect_address(field: AddressField, expected: &str, actual: String) -> Result<(), ScenarioError> {
    match actual == expected {
        true => Ok(()),
        false => AddressMismatchSnafu {
            field,
            expected,
            actual,
        }
        .fail(),
    }
}
