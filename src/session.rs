use std::path::PathBuf;

use serde_json::json;
use snafu::{OptionExt, ResultExt, Snafu};
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::{CapabilitiesHelper, ChromeCapabilities, ChromiumLikeCapabilities};
use url::Url;

use crate::config::SessionOptions;

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("SessionError: Could not build chrome capabilities"))]
    Capabilities { source: WebDriverError },

    #[snafu(display("SessionError: Chrome binary path {path:?} is not valid unicode"))]
    BinaryPath { path: PathBuf },

    #[snafu(display("SessionError: Could not start a session at '{webdriver_url}'"))]
    Connect {
        webdriver_url: Url,
        source: WebDriverError,
    },

    #[snafu(display("SessionError: Could not quit the session"))]
    Quit { source: WebDriverError },
}

/// Makes chromedriver record network events, so that they can be read back through the
/// `performance` log. Required by [`crate::phone_code::retrieve_phone_code`].
pub fn enable_performance_logging(caps: &mut ChromeCapabilities) -> WebDriverResult<()> {
    caps.set_base_capability("goog:loggingPrefs", json!({ "performance": "ALL" }))
}

pub fn chrome_capabilities(options: &SessionOptions) -> Result<ChromeCapabilities, SessionError> {
    let binary = match &options.chrome_binary {
        Some(path) => Some(path.to_str().context(BinaryPathSnafu { path })?),
        None => None,
    };
    build(options, binary).context(CapabilitiesSnafu {})
}

fn build(options: &SessionOptions, binary: Option<&str>) -> WebDriverResult<ChromeCapabilities> {
    let mut caps = DesiredCapabilities::chrome();
    enable_performance_logging(&mut caps)?;
    match options.headless {
        true => caps.set_headless()?,
        false => caps.unset_headless()?,
    }
    for arg in &options.chrome_args {
        caps.add_arg(arg)?;
    }
    if let Some(binary) = binary {
        caps.set_binary(binary)?;
    }
    Ok(caps)
}

/// The one browser session of a run.
///
/// Acquired once in [`BrowserSession::start`] and released with [`BrowserSession::quit`]. Not
/// shared between tasks.
pub struct BrowserSession {
    driver: WebDriver,
}

impl BrowserSession {
    pub async fn start(options: &SessionOptions) -> Result<Self, SessionError> {
        let caps = chrome_capabilities(options)?;
        tracing::info!(webdriver_url = %options.webdriver_url, headless = options.headless, "Starting browser session...");
        let driver = WebDriver::new(options.webdriver_url.as_str(), caps)
            .await
            .context(ConnectSnafu {
                webdriver_url: options.webdriver_url.clone(),
            })?;
        tracing::info!("Browser session started.");
        Ok(Self { driver })
    }

    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    pub async fn quit(self) -> Result<(), SessionError> {
        tracing::info!("Quitting browser session.");
        self.driver.quit().await.context(QuitSnafu {})
    }
}
