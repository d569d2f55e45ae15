//! A small W3C WebDriver client: just enough to drive a meeting tab.

mod capabilities;
mod client;
mod error;
mod locator;

pub use capabilities::{Browser, UnknownBrowser};
pub use client::config::{Config, ConfigBuilder};
pub use client::{Client, Element, Result};
pub use error::WebDriverError;
pub use locator::Locator;

/// Opens a session on the driver at `base_url`.
pub async fn connect(base_url: &str, browser: Browser) -> Result<Client> {
    let config = Config::builder()
        .with_base_url(base_url)
        .with_browser(browser)
        .build();
    Client::connect(config).await
}
