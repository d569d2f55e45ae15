use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Browsers a driver session can be opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown browser: {0} (expected chrome, edge, firefox or safari)")]
pub struct UnknownBrowser(pub String);

impl FromStr for Browser {
    type Err = UnknownBrowser;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "edge" | "msedge" => Ok(Browser::Edge),
            "firefox" => Ok(Browser::Firefox),
            "safari" => Ok(Browser::Safari),
            other => Err(UnknownBrowser(other.to_string())),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Browser::Chrome => "chrome",
            Browser::Edge => "MicrosoftEdge",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
        };
        f.write_str(name)
    }
}

impl Browser {
    /// The `alwaysMatch` capabilities for a meeting session: automation
    /// banner hidden, microphone and camera pre-granted, geolocation denied.
    pub fn capabilities(&self) -> Value {
        let mut caps = json!({ "browserName": self.to_string() });
        match self {
            Browser::Chrome | Browser::Edge => {
                let key = if *self == Browser::Chrome {
                    "goog:chromeOptions"
                } else {
                    "ms:edgeOptions"
                };
                caps[key] = json!({
                    "args": [
                        "--disable-blink-features=AutomationControlled",
                        "--start-maximized"
                    ],
                    "prefs": {
                        "profile.default_content_setting_values.media_stream_mic": 1,
                        "profile.default_content_setting_values.media_stream_camera": 1,
                        "profile.default_content_setting_values.geolocation": 0,
                        "profile.default_content_setting_values.notifications": 1
                    }
                });
            }
            Browser::Firefox => {
                caps["moz:firefoxOptions"] = json!({
                    "prefs": {
                        "permissions.default.microphone": 1,
                        "permissions.default.camera": 1,
                        "permissions.default.geo": 2,
                        "dom.webnotifications.enabled": true
                    }
                });
            }
            Browser::Safari => {}
        }
        json!({ "capabilities": { "alwaysMatch": caps } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browser() {
        assert_eq!("Chrome".parse::<Browser>().unwrap(), Browser::Chrome);
        assert_eq!("msedge".parse::<Browser>().unwrap(), Browser::Edge);
        assert!("lynx".parse::<Browser>().is_err());
    }

    #[test]
    fn test_chrome_capabilities_grant_media() {
        let caps = Browser::Chrome.capabilities();
        let options = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"];

        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "chrome");
        assert_eq!(
            options["prefs"]["profile.default_content_setting_values.media_stream_mic"],
            1
        );
    }

    #[test]
    fn test_firefox_capabilities_use_moz_prefs() {
        let caps = Browser::Firefox.capabilities();
        let prefs = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["prefs"];

        assert_eq!(prefs["permissions.default.geo"], 2);
    }
}
