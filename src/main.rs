use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;
use urban_routes_e2e::{BookingScenario, ScenarioConfig};

/// Books a taxi in the Urban Routes app and checks that the UI follows along.
#[derive(Debug, Parser)]
#[command(name = "urban-routes", version)]
struct Args {
    /// TOML file with trip data and session options. Defaults are used for missing keys.
    #[arg(short, long, env = "URBAN_ROUTES_CONFIG")]
    config: Option<PathBuf>,

    /// Address of the app under test.
    #[arg(long, env = "URBAN_ROUTES_URL")]
    url: Option<Url>,

    /// Where chromedriver is listening.
    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<Url>,

    /// Chrome executable to launch instead of the one chromedriver finds itself.
    #[arg(long, env = "CHROME_BINARY")]
    chrome_binary: Option<PathBuf>,

    /// Run chrome without a window.
    #[arg(long)]
    headless: bool,

    /// Fetch the SMS confirmation code after entering the phone number.
    #[arg(long)]
    retrieve_phone_code: bool,

    /// Wait timeout for UI elements, in milliseconds.
    #[arg(long)]
    ui_timeout_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::from_file(path)?,
            None => ScenarioConfig::default(),
        };
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.session.webdriver_url = webdriver_url;
        }
        if let Some(chrome_binary) = self.chrome_binary {
            config.session.chrome_binary = Some(chrome_binary);
        }
        if let Some(ui_timeout_ms) = self.ui_timeout_ms {
            config.ui_timeout = Duration::from_millis(ui_timeout_ms);
        }
        config.session.headless |= self.headless;
        config.retrieve_phone_code |= self.retrieve_phone_code;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!(url = %config.url, "Starting booking flow.");

    match BookingScenario::new(&config).run().await {
        Ok(outcome) => {
            tracing::info!(
                steps = outcome.completed.len(),
                phone_code = ?outcome.phone_code,
                "Booking flow passed!"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!("Booking flow failed: {:?}", err);
            Err(err.into())
        }
    }
}
