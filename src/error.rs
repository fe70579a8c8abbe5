use snafu::Snafu;

use crate::pages::PageError;
use crate::phone_code::PhoneCodeError;
use crate::scenario::{AddressField, BookingStep};
use crate::session::SessionError;

/// Why a booking run was aborted. Only the first failure of a run is reported.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScenarioError {
    #[snafu(display("ScenarioError: Step {} '{step}' failed", step.ordinal()))]
    Step { step: BookingStep, source: PageError },

    #[snafu(display(
        "ScenarioError: '{field}' address reads back as {actual:?}, expected {expected:?}"
    ))]
    AddressMismatch {
        field: AddressField,
        expected: String,
        actual: String,
    },

    #[snafu(display("ScenarioError: Could not retrieve the phone confirmation code"))]
    PhoneCode { source: PhoneCodeError },

    #[snafu(display("ScenarioError: Browser session failed"))]
    Session { source: SessionError },
}
