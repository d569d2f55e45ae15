use crate::collaborators::{Assistant, MessageSource, SpeechSink, VoiceConfigStore};
use crate::dispatch::{DispatchOutcome, DispatchPolicy};
use crate::message::History;
use crate::sync::{SeenSet, compute_delta};
use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How many dispatched messages end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLimit {
    Unlimited,
    AtMost(usize),
}

impl MessageLimit {
    /// Negative values (conventionally `-1`) disable the limit.
    pub fn from_signed(limit: i64) -> Self {
        if limit < 0 {
            MessageLimit::Unlimited
        } else {
            MessageLimit::AtMost(usize::try_from(limit).unwrap_or(usize::MAX))
        }
    }

    pub fn is_reached(&self, dispatched: usize) -> bool {
        match self {
            MessageLimit::Unlimited => false,
            MessageLimit::AtMost(limit) => dispatched >= *limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Joining,
    Polling,
    Terminated,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The configured number of messages has been read out.
    LimitReached { messages: usize },
    /// The meeting or browser became unusable.
    Aborted { reason: String },
}

/// Result of one polling iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    Continue { outcomes: Vec<DispatchOutcome> },
    Finished(SessionOutcome),
}

/// One unattended meeting session.
///
/// Owns everything that changes while the meeting runs: the ids already seen,
/// the dispatch history and the collaborators it drives.
pub struct RelaySession {
    pub state: RelayState,
    seen: SeenSet,
    history: History,
    policy: DispatchPolicy,
    limit: MessageLimit,
    poll_interval: Duration,
    source: Box<dyn MessageSource>,
    speech: Box<dyn SpeechSink>,
    assistant: Box<dyn Assistant>,
    config_store: Box<dyn VoiceConfigStore>,
    released: bool,
}

impl RelaySession {
    pub fn new(
        policy: DispatchPolicy,
        source: Box<dyn MessageSource>,
        speech: Box<dyn SpeechSink>,
        assistant: Box<dyn Assistant>,
        config_store: Box<dyn VoiceConfigStore>,
    ) -> Self {
        Self {
            state: RelayState::Joining,
            seen: SeenSet::new(),
            history: History::new(),
            policy,
            limit: MessageLimit::Unlimited,
            poll_interval: DEFAULT_POLL_INTERVAL,
            source,
            speech,
            assistant,
            config_store,
            released: false,
        }
    }

    pub fn with_limit(mut self, limit: MessageLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Drives the session from joining until it terminates.
    pub async fn run(&mut self) -> SessionOutcome {
        loop {
            match self.iterate().await {
                Iteration::Continue { .. } => {}
                Iteration::Finished(outcome) => return outcome,
            }
        }
    }

    pub async fn join(&mut self) -> Result<()> {
        tracing::info!("Joining the meeting...");
        self.source
            .join()
            .await
            .context("Failed to join the meeting")?;
        self.state = RelayState::Polling;
        tracing::info!("Joined the meeting. Listening to the chat.");
        Ok(())
    }

    /// Runs one poll-dedupe-dispatch round and checks the exit condition.
    /// Joins first if the session has not joined yet.
    pub async fn iterate(&mut self) -> Iteration {
        if self.state == RelayState::Terminated {
            return Iteration::Finished(SessionOutcome::Aborted {
                reason: "session already terminated".to_string(),
            });
        }

        if self.state == RelayState::Joining {
            if let Err(e) = self.join().await {
                let outcome = SessionOutcome::Aborted {
                    reason: format!("{:#}", e),
                };
                return Iteration::Finished(self.terminate(outcome).await);
            }
        }

        self.refresh_voice_config();

        let snapshot = match self.source.poll().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Meeting error: {:?}", e);
                let outcome = SessionOutcome::Aborted {
                    reason: format!("{:#}", e.context("Failed to read the chat panel")),
                };
                return Iteration::Finished(self.terminate(outcome).await);
            }
        };
        tracing::debug!("Retrieved {} chat entries", snapshot.len());

        let delta = compute_delta(snapshot, &mut self.seen);
        let outcomes = if delta.is_empty() {
            Vec::new()
        } else {
            self.policy
                .dispatch_batch(
                    delta,
                    &mut self.history,
                    self.speech.as_ref(),
                    self.assistant.as_ref(),
                )
                .await
        };

        tokio::time::sleep(self.poll_interval).await;

        if self.limit.is_reached(self.history.len()) {
            let outcome = SessionOutcome::LimitReached {
                messages: self.history.len(),
            };
            return Iteration::Finished(self.terminate(outcome).await);
        }

        Iteration::Continue { outcomes }
    }

    /// Releases the source and moves to `Terminated`. Safe to call twice.
    pub async fn terminate(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.shutdown().await;
        match &outcome {
            SessionOutcome::LimitReached { messages } => {
                tracing::info!("Message limit reached after {} messages", messages)
            }
            SessionOutcome::Aborted { reason } => {
                tracing::error!("Meeting ended: {}", reason)
            }
        }
        outcome
    }

    /// Stops the session without an outcome, e.g. on Ctrl-C.
    pub async fn shutdown(&mut self) {
        self.state = RelayState::Terminated;
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.source.release().await {
            tracing::warn!("Failed to release the meeting session: {:?}", e);
        }
    }

    fn refresh_voice_config(&mut self) {
        let record = match self.config_store.load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Keeping current voice config, reload failed: {:?}", e);
                return;
            }
        };
        let report = self.speech.configure(&record);
        for key in report.changed() {
            match record.get(key) {
                Some(value) => tracing::info!("{} set to: {}", key, value),
                None => tracing::info!("{} changed", key),
            }
        }
        for key in report.invalid() {
            tracing::warn!("{} is not a valid voice setting, ignored", key);
        }
    }
}
