pub const DEFAULT_BASE_URL: &str = "http://localhost:9515";

/// Key under which W3C drivers return web element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const CLICKABLE_POLL_INTERVAL_MS: u64 = 250;
