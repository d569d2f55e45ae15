//! Application Configuration Module
//!
//! Loads the relay's process settings from environment variables (and a
//! `.env` file when present) into a single struct built once at startup.

use meet_webdriver::{Browser, UnknownBrowser};
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use tracing::Level;

// --- Application Constants ---

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_KEY_FILE: &str = "data/keys/gemini.key";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_TTS_VOICE: &str = "alloy";
pub const DEFAULT_VOICES_DIR: &str = "data/voices";
pub const DEFAULT_LOG_DIR: &str = "log";

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantProvider {
    OpenAI,
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    OpenAI,
    Log,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub webdriver_url: String,
    pub browser: Browser,
    pub assistant_provider: AssistantProvider,
    pub speech_backend: SpeechBackend,
    pub openai_api_key: Option<SecretString>,
    pub openai_base_url: String,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_base_url: String,
    pub gemini_key_file: PathBuf,
    pub chat_model: String,
    pub gemini_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub audio_output_device: Option<String>,
    pub voices_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Unknown value {value:?} for {var}")]
    UnknownValue { var: String, value: String },
    #[error(transparent)]
    Browser(#[from] UnknownBrowser),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `ASSISTANT_PROVIDER`: "openai" or "gemini". Defaults to "openai".
    // *   `SPEECH_BACKEND`: "openai" or "log". Defaults to "openai".
    // *   `OPENAI_API_KEY`: Required if either of the above is "openai".
    // *   `GEMINI_API_KEY`: (Optional) Falls back to the key file at `GEMINI_KEY_FILE`.
    // *   `BROWSER`, `WEBDRIVER_URL`: The browser to drive and where its driver listens.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup, so tests do not
    /// have to touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let secret = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(SecretString::from)
        };

        let assistant_provider = match var("ASSISTANT_PROVIDER", "openai").to_lowercase().as_str() {
            "openai" => AssistantProvider::OpenAI,
            "gemini" => AssistantProvider::Gemini,
            other => {
                return Err(ConfigError::UnknownValue {
                    var: "ASSISTANT_PROVIDER".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let speech_backend = match var("SPEECH_BACKEND", "openai").to_lowercase().as_str() {
            "openai" => SpeechBackend::OpenAI,
            "log" => SpeechBackend::Log,
            other => {
                return Err(ConfigError::UnknownValue {
                    var: "SPEECH_BACKEND".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let browser = var("BROWSER", "chrome").parse::<Browser>()?;

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let config = Self {
            webdriver_url: var("WEBDRIVER_URL", DEFAULT_WEBDRIVER_URL),
            browser,
            assistant_provider,
            speech_backend,
            openai_api_key: secret("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            gemini_api_key: secret("GEMINI_API_KEY"),
            gemini_base_url: var("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            gemini_key_file: PathBuf::from(var("GEMINI_KEY_FILE", DEFAULT_GEMINI_KEY_FILE)),
            chat_model: var("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            gemini_model: var("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            tts_model: var("TTS_MODEL", DEFAULT_TTS_MODEL),
            tts_voice: var("TTS_VOICE", DEFAULT_TTS_VOICE),
            audio_output_device: lookup("AUDIO_OUTPUT_DEVICE").filter(|name| !name.is_empty()),
            voices_dir: PathBuf::from(var("VOICES_DIR", DEFAULT_VOICES_DIR)),
            log_dir: PathBuf::from(var("LOG_DIR", DEFAULT_LOG_DIR)),
            log_level,
        };

        // Validate that the necessary API key is present for the chosen backends.
        let needs_openai = config.assistant_provider == AssistantProvider::OpenAI
            || config.speech_backend == SpeechBackend::OpenAI;
        if needs_openai && config.openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_with_openai_key() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();

        assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(config.browser, Browser::Chrome);
        assert_eq!(config.assistant_provider, AssistantProvider::OpenAI);
        assert_eq!(config.speech_backend, SpeechBackend::OpenAI);
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.voices_dir, PathBuf::from("data/voices"));
        assert_eq!(
            config.openai_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-test")
        );
        assert!(config.audio_output_device.is_none());
    }

    #[test]
    fn test_openai_key_required_for_openai_backends() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "OPENAI_API_KEY"));

        let err = load(&[("ASSISTANT_PROVIDER", "gemini")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)), "speech still needs it");
    }

    #[test]
    fn test_gemini_with_log_speech_needs_no_openai_key() {
        let config = load(&[("ASSISTANT_PROVIDER", "Gemini"), ("SPEECH_BACKEND", "log")]).unwrap();

        assert_eq!(config.assistant_provider, AssistantProvider::Gemini);
        assert_eq!(config.speech_backend, SpeechBackend::Log);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_key_file, PathBuf::from(DEFAULT_GEMINI_KEY_FILE));
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let err = load(&[("OPENAI_API_KEY", "k"), ("ASSISTANT_PROVIDER", "claude")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownValue { ref var, .. } if var == "ASSISTANT_PROVIDER"));

        let err = load(&[("OPENAI_API_KEY", "k"), ("BROWSER", "netscape")]).unwrap_err();
        assert!(matches!(err, ConfigError::Browser(_)));

        let err = load(&[("OPENAI_API_KEY", "k"), ("RUST_LOG", "loud")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let err = load(&[("OPENAI_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }
}
