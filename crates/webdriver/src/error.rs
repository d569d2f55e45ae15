/// Errors raised while talking to a WebDriver server.
#[derive(Debug, thiserror::Error)]
pub enum WebDriverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An error payload as defined by the W3C protocol.
    #[error("{error}: {message}")]
    Protocol { error: String, message: String },

    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("no alert is open")]
    NoSuchAlert,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl WebDriverError {
    /// Maps a protocol error body to the most specific variant.
    pub(crate) fn from_protocol(error: String, message: String, locator: Option<String>) -> Self {
        match error.as_str() {
            "no such element" => WebDriverError::NoSuchElement(locator.unwrap_or(message)),
            "no such alert" => WebDriverError::NoSuchAlert,
            "timeout" | "script timeout" => WebDriverError::Timeout(message),
            _ => WebDriverError::Protocol { error, message },
        }
    }

    /// Whether the session itself is gone (closed window, crashed browser).
    pub fn is_session_lost(&self) -> bool {
        match self {
            WebDriverError::Protocol { error, .. } => matches!(
                error.as_str(),
                "invalid session id" | "no such window" | "session not created"
            ),
            WebDriverError::Http(e) => e.is_connect(),
            _ => false,
        }
    }
}
