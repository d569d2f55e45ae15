use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use meet_relay_core::collaborators::Assistant;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

/// Conversation messages (questions plus replies) kept for context. Older
/// exchanges are dropped so long meetings stay inside the model's window.
pub const DEFAULT_MAX_TURNS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Reads an API key file, skipping `-----` armor lines and joining the rest.
pub fn read_key_file(path: &Path) -> Result<SecretString> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file {}", path.display()))?;
    let key: String = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();
    if key.is_empty() {
        return Err(anyhow!("Key file {} holds no key", path.display()));
    }
    Ok(SecretString::from(key))
}

/// Answers chat queries through Gemini's `generateContent`, as one running chat.
pub struct GeminiAssistant {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    conversation: Mutex<Vec<Content>>,
    max_turns: usize,
}

impl GeminiAssistant {
    pub fn new(api_key: SecretString, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            conversation: Mutex::new(Vec::new()),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Caps the kept conversation. Rounded up to whole question/reply pairs.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(2).div_ceil(2) * 2;
        self
    }

    async fn generate(&self, contents: &[Content]) -> Result<Content> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&serde_json::json!({ "contents": contents }))
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateContentResponse>()
            .await?;

        resp.candidates
            .into_iter()
            .next()
            .map(|candidate| candidate.content)
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    async fn ask(&self, query: &str) -> Result<String> {
        let mut conversation = self.conversation.lock().await;
        conversation.push(Content::user(query));

        match self.generate(&conversation).await {
            Ok(mut reply) => {
                let answer = reply.text();
                reply.role = "model".to_string();
                conversation.push(reply);
                if conversation.len() > self.max_turns {
                    let excess = conversation.len() - self.max_turns;
                    conversation.drain(..excess);
                }
                Ok(answer)
            }
            Err(e) => {
                conversation.pop();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_key_file_strips_armor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gemini.key");
        std::fs::write(&path, "-----BEGIN KEY-----\nAIza\nSyTest\n-----END KEY-----\n").unwrap();

        let key = read_key_file(&path).unwrap();

        assert_eq!(key.expose_secret(), "AIzaSyTest");
    }

    #[test]
    fn test_read_key_file_rejects_empty_or_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gemini.key");
        assert!(read_key_file(&path).is_err());

        std::fs::write(&path, "-----BEGIN KEY-----\n-----END KEY-----\n").unwrap();
        assert!(read_key_file(&path).is_err());
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let content: Content = serde_json::from_value(serde_json::json!({
            "role": "model",
            "parts": [{"text": "first"}, {"text": "second  "}]
        }))
        .unwrap();

        assert_eq!(content.text(), "first\nsecond");
    }
}
