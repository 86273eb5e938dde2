//! Sunday core library.
//! Conversation state, persisted history, persona and knowledge prompts, and the upstream
//! completion and speech clients used by the gateway.

pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod knowledge;
pub mod persona;
pub mod prompt;
pub mod session;
pub mod speech;

pub use completion::{CompletionClient, OpenAiCompatClient};
pub use config::{CompletionBackend, GatewayConfig};
pub use conversation::{ChatOutcome, Companion, ContextSnapshot, ConversationState};
pub use error::{ChatError, CompletionError, HistoryError, KnowledgeError, PersonaError, SpeechError};
pub use history::{HistoryStore, Role, Turn};
pub use knowledge::KnowledgeBase;
pub use persona::PersonaSelector;
pub use prompt::ChatMessage;
pub use session::{SessionCommand, SessionContext};
pub use speech::{ElevenLabsTts, SpeechSynthesizer};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
