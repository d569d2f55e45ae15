pub mod collaborators;
pub mod dispatch;
pub mod message;
pub mod session_state;
pub mod sync;
pub mod voice;

pub use collaborators::{Assistant, MessageSource, SpeechSink, VoiceConfigStore};
pub use dispatch::{DispatchOutcome, DispatchPolicy, SkipReason};
pub use message::{ChatMessage, History, RawChatEntry};
pub use session_state::{Iteration, MessageLimit, RelaySession, RelayState, SessionOutcome};
pub use sync::{SeenSet, compute_delta};
pub use voice::{ConfigReport, ConfigStatus, VoiceConfig, VoiceRecord};
