//! Speech sinks: OpenAI text-to-speech played on a local output device, and
//! a log-only sink for dry runs.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use meet_relay_core::collaborators::SpeechSink;
use meet_relay_core::voice::{ConfigReport, VoiceConfig, VoiceRecord};
use meet_relay_native_utils::audio::{TTS_PCM16_SAMPLE_RATE, convert_i16_to_f32, decode_i16};
use meet_relay_native_utils::play_blocking;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Words used for symbols when a message has nothing else to read out.
const SYMBOL_NAMES: &[(char, &str)] = &[
    ('@', "at"),
    ('#', "hash"),
    ('$', "dollar"),
    ('%', "percent"),
    ('^', "caret"),
    ('&', "and"),
    ('*', "star"),
    ('!', "exclamation mark"),
    ('?', "question mark"),
    (':', "colon"),
    ('=', "equals"),
    (')', "close parenthesis"),
    ('(', "open parenthesis"),
];

/// Returns the text a TTS engine should read for `text`.
///
/// Text without a single alphanumeric character (e.g. `"?!"`) would be read as
/// silence, so its known symbols are spelled out instead.
pub fn speakable_text(text: &str) -> String {
    if text.chars().any(|c| c.is_alphanumeric()) {
        return text.to_string();
    }
    text.chars()
        .map(|c| {
            SYMBOL_NAMES
                .iter()
                .find(|(symbol, _)| *symbol == c)
                .map(|(_, name)| format!(" {} ", name))
                .unwrap_or_else(|| c.to_string())
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Speaks through the OpenAI `/v1/audio/speech` endpoint.
pub struct OpenAiSpeech {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    voice: String,
    output_device: Option<String>,
    voices_dir: PathBuf,
    config: VoiceConfig,
    retained: AtomicU64,
}

impl OpenAiSpeech {
    pub fn new(api_key: SecretString, base_url: impl Into<String>, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            voice: voice.into(),
            output_device: None,
            voices_dir: PathBuf::from(crate::config::DEFAULT_VOICES_DIR),
            config: VoiceConfig::default(),
            retained: AtomicU64::new(0),
        }
    }

    pub fn with_output_device(mut self, device: Option<String>) -> Self {
        self.output_device = device;
        self
    }

    pub fn with_voices_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.voices_dir = dir.into();
        self
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Renders `text` as 24 kHz mono PCM16 samples.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<i16>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "pcm",
            "speed": self.config.speed,
            "instructions": format!("Speak in the language with locale tag \"{}\".", self.config.lang),
        });

        let bytes = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(decode_i16(&bytes))
    }

    /// Keeps a rendered utterance as `sound_<unix-millis>_<seq>.wav` under the
    /// voices directory. The sequence number keeps same-millisecond files apart.
    pub fn retain(&self, samples: &[i16]) -> Result<PathBuf> {
        fs::create_dir_all(&self.voices_dir)
            .with_context(|| format!("Failed to create {}", self.voices_dir.display()))?;
        let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let seq = self.retained.fetch_add(1, Ordering::Relaxed);
        let path = self.voices_dir.join(format!("sound_{}_{}.wav", millis, seq));
        write_wav(&path, samples)?;
        Ok(path)
    }
}

fn write_wav(path: &Path, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TTS_PCM16_SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[async_trait]
impl SpeechSink for OpenAiSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = speakable_text(text);
        if text.trim().is_empty() {
            return Ok(());
        }
        tracing::debug!("Synthesizing: {}", text);

        let pcm = self.synthesize(&text).await.context("Speech synthesis failed")?;
        if !self.config.remove_audio {
            match self.retain(&pcm) {
                Ok(path) => tracing::info!("Saved utterance to {}", path.display()),
                Err(e) => tracing::warn!("Failed to save utterance: {:?}", e),
            }
        }

        let samples = convert_i16_to_f32(&pcm);
        let device = self.output_device.clone();
        tokio::task::spawn_blocking(move || {
            play_blocking(&samples, TTS_PCM16_SAMPLE_RATE, device.as_deref())
        })
        .await
        .map_err(|e| anyhow!("Playback task failed: {}", e))?
        .context("Playback failed")
    }

    fn configure(&mut self, record: &VoiceRecord) -> ConfigReport {
        self.config.apply(record)
    }
}

/// Writes utterances to the log instead of playing them.
#[derive(Debug, Default)]
pub struct LogSpeech {
    config: VoiceConfig,
}

impl LogSpeech {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpeechSink for LogSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::info!(speed = self.config.speed, lang = %self.config.lang, "Speaking: {}", speakable_text(text));
        Ok(())
    }

    fn configure(&mut self, record: &VoiceRecord) -> ConfigReport {
        self.config.apply(record)
    }
}
