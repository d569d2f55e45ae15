use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A voice configuration record as it is persisted: a plain JSON object.
pub type VoiceRecord = Map<String, Value>;

pub const SPEED_KEY: &str = "speed";
pub const LANG_KEY: &str = "lang";
pub const REMOVE_AUDIO_KEY: &str = "remove_audio";

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// Live settings of a speech sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Playback speed multiplier.
    pub speed: f32,
    /// Locale tag of the spoken language.
    pub lang: String,
    /// Delete rendered audio after playback instead of keeping it on disk.
    pub remove_audio: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            lang: "en".to_string(),
            remove_audio: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Unchanged,
    Changed,
    Invalid,
}

/// Outcome of applying a record, one entry per key that was looked at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigReport {
    entries: Vec<(String, ConfigStatus)>,
}

impl ConfigReport {
    pub fn push(&mut self, key: impl Into<String>, status: ConfigStatus) {
        self.entries.push((key.into(), status));
    }

    pub fn status(&self, key: &str) -> Option<ConfigStatus> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, status)| *status)
    }

    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.with_status(ConfigStatus::Changed)
    }

    pub fn invalid(&self) -> impl Iterator<Item = &str> {
        self.with_status(ConfigStatus::Invalid)
    }

    fn with_status(&self, wanted: ConfigStatus) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, status)| *status == wanted)
            .map(|(key, _)| key.as_str())
    }
}

impl VoiceConfig {
    /// Applies every recognized key of `record`. Unknown keys and values of the
    /// wrong type are reported as invalid and leave the config untouched.
    pub fn apply(&mut self, record: &VoiceRecord) -> ConfigReport {
        let mut report = ConfigReport::default();
        for key in [SPEED_KEY, LANG_KEY, REMOVE_AUDIO_KEY] {
            if !record.contains_key(key) {
                report.push(key, ConfigStatus::Unchanged);
            }
        }

        for (key, value) in record {
            let status = match key.as_str() {
                SPEED_KEY => match value.as_f64() {
                    Some(speed) => {
                        let speed = (speed as f32).clamp(MIN_SPEED, MAX_SPEED);
                        update(&mut self.speed, speed)
                    }
                    None => ConfigStatus::Invalid,
                },
                LANG_KEY => match value.as_str().map(str::trim) {
                    Some(lang) if !lang.is_empty() => update(&mut self.lang, lang.to_string()),
                    _ => ConfigStatus::Invalid,
                },
                REMOVE_AUDIO_KEY => match value.as_bool() {
                    Some(remove) => update(&mut self.remove_audio, remove),
                    None => ConfigStatus::Invalid,
                },
                _ => ConfigStatus::Invalid,
            };
            report.push(key.clone(), status);
        }
        report
    }

    pub fn to_record(&self) -> VoiceRecord {
        let mut record = Map::new();
        record.insert(SPEED_KEY.to_string(), Value::from(f64::from(self.speed)));
        record.insert(LANG_KEY.to_string(), Value::from(self.lang.clone()));
        record.insert(REMOVE_AUDIO_KEY.to_string(), Value::from(self.remove_audio));
        record
    }
}

fn update<T: PartialEq>(slot: &mut T, value: T) -> ConfigStatus {
    if *slot == value {
        ConfigStatus::Unchanged
    } else {
        *slot = value;
        ConfigStatus::Changed
    }
}

impl fmt::Display for VoiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "speed={} lang={} remove_audio={}",
            self.speed, self.lang, self.remove_audio
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> VoiceRecord {
        value.as_object().cloned().expect("test record must be an object")
    }

    #[test]
    fn test_default_record_applies_cleanly() {
        let mut config = VoiceConfig::default();
        let report = config.apply(&VoiceConfig::default().to_record());

        assert_eq!(report.changed().count(), 0);
        assert_eq!(report.invalid().count(), 0);
        assert_eq!(config, VoiceConfig::default());
    }

    #[test]
    fn test_changed_keys_are_reported() {
        let mut config = VoiceConfig::default();
        let report = config.apply(&record(json!({ "speed": 1.5, "lang": "vi" })));

        assert_eq!(report.status("speed"), Some(ConfigStatus::Changed));
        assert_eq!(report.status("lang"), Some(ConfigStatus::Changed));
        assert_eq!(report.status("remove_audio"), Some(ConfigStatus::Unchanged));
        assert_eq!(config.speed, 1.5);
        assert_eq!(config.lang, "vi");
    }

    #[test]
    fn test_unknown_key_is_invalid_but_not_fatal() {
        let mut config = VoiceConfig::default();
        let report = config.apply(&record(json!({ "PATH": "audio.mp3", "speed": 1.25 })));

        assert_eq!(report.status("PATH"), Some(ConfigStatus::Invalid));
        assert_eq!(report.status("speed"), Some(ConfigStatus::Changed));
        assert_eq!(config.speed, 1.25);
    }

    #[test]
    fn test_wrong_type_is_invalid_and_keeps_value() {
        let mut config = VoiceConfig::default();
        let report = config.apply(&record(json!({ "speed": "fast", "remove_audio": "yes" })));

        assert_eq!(report.status("speed"), Some(ConfigStatus::Invalid));
        assert_eq!(report.status("remove_audio"), Some(ConfigStatus::Invalid));
        assert_eq!(config, VoiceConfig::default());
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut config = VoiceConfig::default();
        config.apply(&record(json!({ "speed": 9.0 })));
        assert_eq!(config.speed, MAX_SPEED);

        config.apply(&record(json!({ "speed": 0.1 })));
        assert_eq!(config.speed, MIN_SPEED);
    }
}
