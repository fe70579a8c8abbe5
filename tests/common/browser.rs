use std::path::PathBuf;

use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, ChromiumLikeCapabilities};

/// Session setup for every UI test: no window, network events recorded.
pub fn configure(caps: &mut ChromeCapabilities) -> WebDriverResult<()> {
    caps.set_headless()?;
    urban_routes_e2e::session::enable_performance_logging(caps)
}

/// Location of the chrome executable the given session runs in.
pub async fn chrome_executable(driver: &WebDriver) -> WebDriverResult<PathBuf> {
    driver.goto("chrome://version").await?;
    let path = driver.find(By::Id("executable_path")).await?.text().await?;
    Ok(PathBuf::from(path.trim()))
}

/// A port nothing listens on right now.
pub fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
