use anyhow::{Result, anyhow};
use async_trait::async_trait;
use meet_relay_core::collaborators::Assistant;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Conversation messages (questions plus replies) kept for context. Older
/// exchanges are dropped so long meetings stay inside the model's window.
pub const DEFAULT_MAX_TURNS: usize = 40;

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatTurn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Answers chat queries through `/v1/chat/completions`, carrying the recent
/// conversation so follow-up questions keep their context.
pub struct OpenAiAssistant {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    conversation: Mutex<Vec<ChatTurn>>,
    max_turns: usize,
}

impl OpenAiAssistant {
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

    async fn complete(&self, messages: &[ChatTurn]) -> Result<ChatTurn> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<LlmResponse>()
            .await?;

        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| anyhow!("No response from LLM"))
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn ask(&self, query: &str) -> Result<String> {
        let mut conversation = self.conversation.lock().await;
        conversation.push(ChatTurn::user(query));

        match self.complete(&conversation).await {
            Ok(reply) => {
                let answer = reply.content.trim().to_string();
                conversation.push(reply);
                if conversation.len() > self.max_turns {
                    let excess = conversation.len() - self.max_turns;
                    conversation.drain(..excess);
                }
                Ok(answer)
            }
            Err(e) => {
                // Drop the unanswered turn so the next query is not sent after it.
                conversation.pop();
                Err(e)
            }
        }
    }
}
