use crate::capabilities::Browser;
use crate::client::consts::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use std::time::Duration;

pub struct Config {
    base_url: String,
    browser: Browser,
    request_timeout: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_browser(mut self, browser: Browser) -> Self {
        self.config.browser = browser;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: Browser::Chrome,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn browser(&self) -> Browser {
        self.browser
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
