//! The seams between the relay session and the outside world.
//!
//! The session only ever talks to these traits, so a backend is chosen once
//! when the session is built and never branched on inside the loop.

use crate::message::RawChatEntry;
use crate::voice::{ConfigReport, VoiceRecord};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// A live meeting whose chat panel can be sampled.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Signs in, enters the meeting and silences the local microphone and camera.
    async fn join(&mut self) -> Result<()>;

    /// Returns every chat entry currently rendered, in no particular order.
    async fn poll(&mut self) -> Result<Vec<RawChatEntry>>;

    /// Tears down the underlying browser session.
    async fn release(&mut self) -> Result<()>;
}

/// Renders text as audio. `speak` resolves only once playback has finished.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;

    fn configure(&mut self, record: &VoiceRecord) -> ConfigReport;
}

/// A language model that answers chat queries.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ask(&self, query: &str) -> Result<String>;
}

/// Durable storage of the voice configuration record.
#[cfg_attr(test, automock)]
pub trait VoiceConfigStore: Send + Sync {
    fn load(&self) -> Result<VoiceRecord>;
}
