use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use url::Url;

/// Sandbox instance the booking flow runs against unless configured otherwise.
pub const DEFAULT_APP_URL: &str =
    "https://cnt-db4e6c56-7e38-41d5-b496-f40dae988370.containerhub.tripleten-services.com?lng=es";

/// Default port chromedriver listens on when started without arguments.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// URL fragment of the request the app issues when it sends an SMS code.
pub const PHONE_CODE_ENDPOINT_PATTERN: &str = "api/v1/number?number";

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("ConfigError: Could not read config file {path:?}"))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("ConfigError: Could not parse config: {source}"))]
    Parse { source: toml::de::Error },
}

/// Everything a booking run needs: where the app lives, what to type into it and how to talk to
/// the browser.
///
/// Every key is optional when loading from TOML. Missing keys keep their default value, so an
/// empty file describes the reference booking flow against the sandbox instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Address of the Urban Routes app under test.
    pub url: Url,

    pub trip: TripData,

    pub session: SessionOptions,

    /// How the SMS verification code is polled for.
    pub phone_code: RetryPolicy,

    /// Whether the run should fetch the SMS code right after entering the phone number.
    /// Defaults to `false`.
    pub retrieve_phone_code: bool,

    /// How long a page action waits for an element to become visible or clickable.
    /// Defaults to `Duration::from_secs(10)`.
    #[serde(rename = "ui_timeout_ms", with = "duration_ms")]
    pub ui_timeout: Duration,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_APP_URL).expect("valid url"),
            trip: TripData::default(),
            session: SessionOptions::default(),
            phone_code: RetryPolicy::default(),
            retrieve_phone_code: false,
            ui_timeout: Duration::from_secs(10),
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).context(ParseSnafu {})
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        tracing::debug!(?path, "Loaded scenario config.");
        Self::from_toml_str(&content)
    }
}

/// Input fixtures of one booking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TripData {
    pub address_from: String,
    pub address_to: String,
    pub phone_number: String,
    pub card: CardDetails,
    pub driver_message: String,
    pub ice_creams: u32,
}

impl Default for TripData {
    fn default() -> Self {
        Self {
            address_from: "East 2nd Street, 601".to_owned(),
            address_to: "1300 1st St".to_owned(),
            phone_number: "123456789".to_owned(),
            card: CardDetails::default(),
            driver_message: "Llevarme rápido".to_owned(),
            ice_creams: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardDetails {
    pub number: String,

    /// In `MM/YY` form, as the payment form expects it.
    pub expiration: String,

    /// The CVV.
    pub code: String,
}

impl Default for CardDetails {
    fn default() -> Self {
        Self {
            number: "4111111111111111".to_owned(),
            expiration: "12/25".to_owned(),
            code: "123".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    /// Where chromedriver is listening.
    pub webdriver_url: Url,

    /// Run chrome without a visible window. Defaults to `false`.
    pub headless: bool,

    /// Additional command line arguments for chrome, e.g. `--window-size=1280,1024`.
    pub chrome_args: Vec<String>,

    /// Chrome executable to launch. Defaults to `None`, letting chromedriver search its default
    /// install locations.
    pub chrome_binary: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            webdriver_url: Url::parse(DEFAULT_WEBDRIVER_URL).expect("valid url"),
            headless: false,
            chrome_args: Vec::new(),
            chrome_binary: None,
        }
    }
}

/// Bounded polling used when looking for the SMS verification code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Number of times the network log is scanned before giving up. Defaults to `10`.
    pub attempts: u32,

    /// Pause between two scans. Defaults to `Duration::from_secs(1)`.
    #[serde(rename = "delay_ms", with = "duration_ms")]
    pub delay: Duration,

    /// Substring identifying the code-issuing request in a log message.
    pub endpoint_pattern: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(1),
            endpoint_pattern: PHONE_CODE_ENDPOINT_PATTERN.to_owned(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
