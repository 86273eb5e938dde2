//! The single implicit conversation: session directives, the sticky user name, history,
//! knowledge, and the completion call that ties them together.

use crate::completion::CompletionClient;
use crate::error::{ChatError, KnowledgeError};
use crate::history::{now_timestamp, HistoryStore, Turn};
use crate::knowledge::KnowledgeBase;
use crate::persona::{capture_name, PersonaSelector};
use crate::prompt;
use crate::session::{SessionCommand, SessionContext};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide mutable state shared by every request.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub session: SessionContext,
    pub user_name: Option<String>,
}

/// Result of one chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// A session command was applied; text is its confirmation.
    Command(String),
    /// The assistant replied (trimmed) and both turns were persisted.
    Reply(String),
}

impl ChatOutcome {
    pub fn text(&self) -> &str {
        match self {
            ChatOutcome::Command(t) | ChatOutcome::Reply(t) => t,
        }
    }
}

/// Read-only view of the conversation state.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub summary: String,
    pub modes: Vec<String>,
    pub tone: Option<String>,
    pub facts: Vec<String>,
    pub user_name: Option<String>,
    pub persona: &'static str,
}

/// Chat orchestration over the history store, knowledge base, persona and completion client.
pub struct Companion {
    history: HistoryStore,
    knowledge: RwLock<KnowledgeBase>,
    persona: PersonaSelector,
    state: RwLock<ConversationState>,
    completion: Arc<dyn CompletionClient>,
    temperature: f64,
}

impl Companion {
    pub fn new(
        history: HistoryStore,
        knowledge: KnowledgeBase,
        persona: PersonaSelector,
        completion: Arc<dyn CompletionClient>,
        temperature: f64,
    ) -> Self {
        Self {
            history,
            knowledge: RwLock::new(knowledge),
            persona,
            state: RwLock::new(ConversationState::default()),
            completion,
            temperature,
        }
    }

    pub fn completion(&self) -> &dyn CompletionClient {
        self.completion.as_ref()
    }

    /// Handle one raw chat message.
    ///
    /// Session commands short-circuit: no name capture, no completion call, no history write.
    /// On completion or write failure the history is left as it was.
    pub async fn handle_message(&self, message: &str) -> Result<ChatOutcome, ChatError> {
        if let Some(command) = SessionCommand::parse(message) {
            let confirmation = self.state.write().await.session.apply(&command);
            tracing::info!(target: "sunday::chat", ?command, "Session command applied");
            return Ok(ChatOutcome::Command(confirmation));
        }

        let (persona, summary) = {
            let mut state = self.state.write().await;
            if let Some(name) = capture_name(message) {
                tracing::info!(target: "sunday::chat", name = %name, "User name captured");
                state.user_name = Some(name);
            }
            let name = state.user_name.as_deref();
            tracing::debug!(target: "sunday::chat", persona = self.persona.label(name), "Persona selected");
            (self.persona.select(name).to_string(), state.session.format())
        };

        let history = self.history.load().await;
        let messages = {
            let knowledge = self.knowledge.read().await;
            prompt::assemble(&persona, &summary, knowledge.text(), &history, message)
        };

        tracing::debug!(
            target: "sunday::chat",
            model = self.completion.model(),
            messages = messages.len(),
            "Calling completion API"
        );
        let reply = self
            .completion
            .complete(&messages, self.temperature)
            .await
            .map_err(|e| {
                tracing::error!(target: "sunday::chat", "Completion failed: {}", e);
                e
            })?;
        let reply = reply.trim().to_string();

        let len = self
            .history
            .append_exchange(message, &reply, &now_timestamp())
            .await?;
        tracing::info!(target: "sunday::chat", history_len = len, "Exchange recorded");
        Ok(ChatOutcome::Reply(reply))
    }

    pub async fn load_history(&self) -> Vec<Turn> {
        self.history.load().await
    }

    pub async fn clear_history(&self) -> Result<(), ChatError> {
        Ok(self.history.clear().await?)
    }

    pub async fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read().await;
        let name = state.user_name.as_deref();
        ContextSnapshot {
            summary: state.session.format(),
            modes: state.session.modes().to_vec(),
            tone: state.session.tone().map(str::to_string),
            facts: state.session.facts().to_vec(),
            user_name: state.user_name.clone(),
            persona: self.persona.label(name),
        }
    }

    /// Replace the knowledge base with the documents currently in `dir`.
    /// The old one stays in place if reading fails.
    pub async fn reload_knowledge(&self, dir: &Path) -> Result<(usize, usize), KnowledgeError> {
        let fresh = KnowledgeBase::load_dir(dir)?;
        let counts = (fresh.documents(), fresh.len());
        *self.knowledge.write().await = fresh;
        Ok(counts)
    }

    /// (documents, chars) of the current knowledge base.
    pub async fn knowledge_size(&self) -> (usize, usize) {
        let kb = self.knowledge.read().await;
        (kb.documents(), kb.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::prompt::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed reply.
    struct Scripted {
        reply: Result<String, u16>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _temperature: f64,
        ) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(status) => Err(CompletionError::Api {
                    status: *status,
                    body: "upstream down".into(),
                }),
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn companion(dir: &Path, reply: Result<String, u16>) -> (Companion, Arc<Scripted>) {
        let client = Arc::new(Scripted {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let companion = Companion::new(
            HistoryStore::new(dir.join("history.json")),
            KnowledgeBase::from_text("kb"),
            PersonaSelector::generic("GENERIC").with_named("sharif", "NAMED {name}"),
            client.clone(),
            0.9,
        );
        (companion, client)
    }

    #[tokio::test]
    async fn command_is_confirmed_without_completion_or_history() {
        let dir = tempfile::tempdir().unwrap();
        let (c, client) = companion(dir.path(), Ok("unused".into()));
        let out = c.handle_message("!tone playful").await.unwrap();
        assert_eq!(
            out,
            ChatOutcome::Command("Tone set to 'playful' for this session.".into())
        );
        assert!(client.seen.lock().unwrap().is_empty());
        assert!(c.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn reply_is_trimmed_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = companion(dir.path(), Ok("  hey there \n".into()));
        let out = c.handle_message("hello").await.unwrap();
        assert_eq!(out.text(), "hey there");
        let history = c.load_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "hey there");
        assert_eq!(history[0].timestamp, history[1].timestamp);
    }

    #[tokio::test]
    async fn failed_completion_leaves_history_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (c, _) = companion(dir.path(), Err(503));
        let err = c.handle_message("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(c.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn captured_trigger_name_sticks_across_messages() {
        let dir = tempfile::tempdir().unwrap();
        let (c, client) = companion(dir.path(), Ok("ok".into()));
        c.handle_message("hi").await.unwrap();
        c.handle_message("my name is sharif").await.unwrap();
        c.handle_message("what's up").await.unwrap();
        assert_eq!(c.snapshot().await.persona, "named");

        let seen = client.seen.lock().unwrap();
        assert!(seen[0][0].content.starts_with("GENERIC"));
        assert!(seen[1][0].content.starts_with("NAMED Sharif"));
        assert!(seen[2][0].content.starts_with("NAMED Sharif"));
    }

    #[tokio::test]
    async fn session_context_reaches_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let (c, client) = companion(dir.path(), Ok("ok".into()));
        c.handle_message("!mode focus").await.unwrap();
        c.handle_message("!fact likes tea").await.unwrap();
        c.handle_message("go").await.unwrap();

        let seen = client.seen.lock().unwrap();
        let system = &seen[0][0].content;
        assert!(system.contains("--- SESSION CONTEXT ---\nActive modes: focus\nSession facts: likes tea"));
        assert!(system.ends_with("--- MY KNOWLEDGE BASE ---\nkb"));
    }

    #[tokio::test]
    async fn reload_swaps_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("documents");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "alpha").unwrap();
        let (c, _) = companion(dir.path(), Ok("ok".into()));
        assert_eq!(c.reload_knowledge(&docs).await.unwrap(), (1, "alpha\n\n".len()));
        assert_eq!(c.knowledge_size().await, (1, 7));
    }
}
