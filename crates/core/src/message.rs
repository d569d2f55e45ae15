use serde::{Deserialize, Serialize};

/// One chat entry exactly as a message source scraped it.
///
/// Sources make no promises about completeness: the id may be missing when the
/// entry was still rendering, and the body may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChatEntry {
    pub timestamp: String,
    pub author: String,
    pub message_id: Option<String>,
    pub text: String,
}

impl RawChatEntry {
    pub fn new(
        timestamp: impl Into<String>,
        author: impl Into<String>,
        message_id: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            author: author.into(),
            message_id,
            text: text.into(),
        }
    }
}

/// A well-formed chat message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    timestamp: String,
    author: String,
    message_id: String,
    text: String,
}

impl ChatMessage {
    pub fn new(
        timestamp: impl Into<String>,
        author: impl Into<String>,
        message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            author: author.into(),
            message_id: message_id.into(),
            text: text.into(),
        }
    }

    /// Returns `None` for entries without an id or with a blank body.
    pub fn from_raw(raw: RawChatEntry) -> Option<Self> {
        let message_id = raw.message_id.filter(|id| !id.trim().is_empty())?;
        if raw.text.trim().is_empty() {
            return None;
        }
        Some(Self {
            timestamp: raw.timestamp,
            author: raw.author,
            message_id,
            text: raw.text,
        })
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Messages handed to the dispatch policy, in the order they were dispatched.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
