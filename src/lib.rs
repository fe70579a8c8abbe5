//! End-to-end test of the taxi booking flow of the Urban Routes web app.
//!
//! The crate drives a Chrome session through chromedriver:
//!
//! - [`pages::urban_routes::UrbanRoutesPage`] names every UI element the flow touches and offers
//!   one method per user intention (set the route, pick a fare, link a card, ...).
//! - [`scenario::BookingScenario`] sequences those methods into the nine steps of one booking and
//!   checks that the entered addresses are echoed back.
//! - [`phone_code::retrieve_phone_code`] reads the SMS confirmation code from the browser's
//!   network log instead of the UI.
//!
//! ```no_run
//! use urban_routes_e2e::{BookingScenario, ScenarioConfig};
//!
//! # async fn book() -> Result<(), urban_routes_e2e::ScenarioError> {
//! // Expects chromedriver to listen on http://localhost:9515.
//! let config = ScenarioConfig::default();
//! let outcome = BookingScenario::new(&config).run().await?;
//! assert_eq!(outcome.completed.len(), 9);
//! # Ok(())
//! # }
//! ```
//!
//! Individual pages can also be used on a session managed elsewhere, e.g. one handed out by
//! `chrome-for-testing-manager`:
//!
//! ```no_run
//! use thirtyfour::WebDriver;
//! use urban_routes_e2e::pages::urban_routes::UrbanRoutesPage;
//!
//! # async fn route(driver: &WebDriver, url: &url::Url) -> Result<(), urban_routes_e2e::pages::PageError> {
//! let page = UrbanRoutesPage::new(driver);
//! page.goto(url).await?;
//! page.set_from("East 2nd Street, 601").await?;
//! page.set_to("1300 1st St").await?;
//! assert_eq!(page.get_from().await?, "East 2nd Street, 601");
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod locator;
pub mod pages;
pub mod phone_code;
pub mod scenario;
pub mod session;

pub use config::{CardDetails, RetryPolicy, ScenarioConfig, SessionOptions, TripData};
pub use error::ScenarioError;
pub use phone_code::{VerificationCode, retrieve_phone_code};
pub use scenario::{BookingOutcome, BookingScenario, BookingStep};
pub use session::BrowserSession;
