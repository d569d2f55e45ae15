use crate::collaborators::{Assistant, SpeechSink};
use crate::message::{ChatMessage, History};

pub const DEFAULT_COMMAND_PREFIX: &str = "/respone";
pub const DEFAULT_REPLY_PREAMBLE: &str = "I will answer your question as follows: ";
pub const DEFAULT_LINK_PREFIXES: [&str; 2] = ["http:", "https:"];
/// Until History holds this many entries every message is announced.
pub const DEFAULT_ANNOUNCE_WARMUP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Written by the relay's own account.
    OwnMessage,
    /// Body starts with a link.
    Link,
}

/// What happened to a single message of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Delivered {
        query: bool,
        failed_utterances: usize,
    },
    /// The body was read but no reply could be obtained.
    AssistantFailed { error: String },
}

impl DispatchOutcome {
    /// Whether the message ended up in History.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, DispatchOutcome::Skipped(_))
    }
}

/// Decides how each new chat message is vocalized.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    self_name: String,
    command_prefix: String,
    reply_preamble: String,
    link_prefixes: Vec<String>,
    announce_warmup: usize,
}

impl DispatchPolicy {
    pub fn new(self_name: impl Into<String>) -> Self {
        Self {
            self_name: self_name.into(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            reply_preamble: DEFAULT_REPLY_PREAMBLE.to_string(),
            link_prefixes: DEFAULT_LINK_PREFIXES.iter().map(|p| p.to_string()).collect(),
            announce_warmup: DEFAULT_ANNOUNCE_WARMUP,
        }
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn with_reply_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.reply_preamble = preamble.into();
        self
    }

    pub fn with_announce_warmup(mut self, entries: usize) -> Self {
        self.announce_warmup = entries;
        self
    }

    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn skip_reason(&self, message: &ChatMessage) -> Option<SkipReason> {
        if message.author() == self.self_name {
            Some(SkipReason::OwnMessage)
        } else if self
            .link_prefixes
            .iter()
            .any(|prefix| message.text().starts_with(prefix.as_str()))
        {
            Some(SkipReason::Link)
        } else {
            None
        }
    }

    /// Whether the author name should be spoken before `message`.
    ///
    /// Consecutive messages of one author within the same timestamp token are
    /// read as one stream; a new author or a new timestamp is re-announced.
    pub fn is_speaker_change(&self, history: &History, message: &ChatMessage) -> bool {
        if history.len() < self.announce_warmup {
            return true;
        }
        match history.last() {
            Some(last) => {
                last.author() != message.author() || last.timestamp() != message.timestamp()
            }
            None => true,
        }
    }

    /// Splits off the command prefix. Returns the spoken body and whether the
    /// message is a query for the assistant.
    pub fn parse_body<'a>(&self, text: &'a str) -> (&'a str, bool) {
        if self.command_prefix.is_empty() {
            return (text, false);
        }
        match text.strip_prefix(self.command_prefix.as_str()) {
            Some(rest) => (rest, true),
            None => (text, false),
        }
    }

    /// Vocalizes `batch` in order and appends every message that was not
    /// skipped to `history`. One outcome is returned per input message.
    pub async fn dispatch_batch(
        &self,
        batch: Vec<ChatMessage>,
        history: &mut History,
        speech: &dyn SpeechSink,
        assistant: &dyn Assistant,
    ) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for message in batch {
            let outcome = self.dispatch_one(&message, history, speech, assistant).await;
            if outcome.is_recorded() {
                history.push(message);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn dispatch_one(
        &self,
        message: &ChatMessage,
        history: &History,
        speech: &dyn SpeechSink,
        assistant: &dyn Assistant,
    ) -> DispatchOutcome {
        if let Some(reason) = self.skip_reason(message) {
            tracing::debug!(
                message_id = message.message_id(),
                "Skipping chat message: {:?}",
                reason
            );
            return DispatchOutcome::Skipped(reason);
        }

        tracing::info!(
            "New chat message: [{}] {}: {}",
            message.timestamp(),
            message.author(),
            message.text()
        );

        let mut failed_utterances = 0;
        if self.is_speaker_change(history, message) {
            failed_utterances += say(speech, message.author()).await;
        }

        let (body, query) = self.parse_body(message.text());
        failed_utterances += say(speech, body).await;

        if query {
            let reply = match assistant.ask(body).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(
                        message_id = message.message_id(),
                        "Assistant failed to answer query: {:?}",
                        e
                    );
                    return DispatchOutcome::AssistantFailed {
                        error: e.to_string(),
                    };
                }
            };
            tracing::info!("Assistant replied: {}", reply);
            let spoken_reply = format!("{}{}", self.reply_preamble, reply);
            failed_utterances += say(speech, &spoken_reply).await;
        }

        DispatchOutcome::Delivered {
            query,
            failed_utterances,
        }
    }
}

/// Speaks one utterance. Returns the number of failures (0 or 1).
async fn say(speech: &dyn SpeechSink, text: &str) -> usize {
    match speech.speak(text).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::warn!("Failed to speak utterance {:?}: {:?}", text, e);
            1
        }
    }
}
