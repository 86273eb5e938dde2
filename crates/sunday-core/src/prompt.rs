//! Prompt assembly: persona, session context, and knowledge base become one system message,
//! followed by the full history and the new user message.
//!
//! Nothing is truncated; the whole history and knowledge base go out with every request.

use crate::history::{Role, Turn};
use serde::{Deserialize, Serialize};

pub const SESSION_CONTEXT_HEADER: &str = "--- SESSION CONTEXT ---";
pub const KNOWLEDGE_BASE_HEADER: &str = "--- MY KNOWLEDGE BASE ---";

/// Role tag in the completion API message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// One entry of the completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// The system message text.
pub fn system_prompt(persona: &str, session_summary: &str, knowledge: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n\n{}\n{}",
        persona, SESSION_CONTEXT_HEADER, session_summary, KNOWLEDGE_BASE_HEADER, knowledge
    )
}

/// Full message list for one completion call.
pub fn assemble(
    persona: &str,
    session_summary: &str,
    knowledge: &str,
    history: &[Turn],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(persona, session_summary, knowledge)));
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role.into(),
        content: turn.content.clone(),
    }));
    messages.push(ChatMessage::user(user_message));
    messages
}
