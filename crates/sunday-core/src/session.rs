//! Session context: ephemeral modes, tone, and facts driven by `!`-prefixed chat commands.
//!
//! Commands are intercepted before the completion call and never reach history.

use serde::Serialize;

/// Summary used when no mode, tone, or fact is set.
pub const NO_CONTEXT: &str = "No active session context.";

const MODE_PREFIX: &str = "!mode ";
const TONE_PREFIX: &str = "!tone ";
const FACT_PREFIX: &str = "!fact ";
const CLEAR_COMMAND: &str = "!clearcontext";

/// Process-wide session directives. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    modes: Vec<String>,
    tone: Option<String>,
    facts: Vec<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` unless empty or already active.
    pub fn activate_mode(&mut self, name: &str) -> String {
        if !name.is_empty() && !self.modes.iter().any(|m| m == name) {
            self.modes.push(name.to_string());
        }
        format!("Mode '{}' activated for this session.", name)
    }

    /// Last write wins; an empty value leaves the tone unset.
    pub fn set_tone(&mut self, value: &str) -> String {
        self.tone = Some(value.to_string()).filter(|t| !t.is_empty());
        format!("Tone set to '{}' for this session.", value)
    }

    pub fn add_fact(&mut self, text: &str) -> String {
        if !text.is_empty() {
            self.facts.push(text.to_string());
        }
        format!("Fact noted: '{}' for this session.", text)
    }

    pub fn clear_context(&mut self) -> String {
        self.modes.clear();
        self.tone = None;
        self.facts.clear();
        "Session context cleared.".to_string()
    }

    /// Multi-line summary for the system prompt.
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if !self.modes.is_empty() {
            parts.push(format!("Active modes: {}", self.modes.join(", ")));
        }
        if let Some(tone) = &self.tone {
            parts.push(format!("Current tone: {}", tone));
        }
        if !self.facts.is_empty() {
            parts.push(format!("Session facts: {}", self.facts.join("; ")));
        }
        if parts.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            parts.join("\n")
        }
    }

    /// Apply a parsed command and return its confirmation text.
    pub fn apply(&mut self, command: &SessionCommand) -> String {
        match command {
            SessionCommand::Mode(name) => self.activate_mode(name),
            SessionCommand::Tone(value) => self.set_tone(value),
            SessionCommand::Fact(text) => self.add_fact(text),
            SessionCommand::ClearContext => self.clear_context(),
        }
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    pub fn tone(&self) -> Option<&str> {
        self.tone.as_deref()
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }
}

/// A session directive recognised in a raw chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Mode(String),
    Tone(String),
    Fact(String),
    ClearContext,
}

impl SessionCommand {
    /// Recognise `!mode `, `!tone `, `!fact ` (case-insensitive prefix, argument trimmed)
    /// or exactly `!clearcontext` (case-insensitive). Anything else is a normal message.
    pub fn parse(message: &str) -> Option<Self> {
        if let Some(arg) = strip_prefix_ignore_case(message, MODE_PREFIX) {
            return Some(SessionCommand::Mode(arg.trim().to_string()));
        }
        if let Some(arg) = strip_prefix_ignore_case(message, TONE_PREFIX) {
            return Some(SessionCommand::Tone(arg.trim().to_string()));
        }
        if let Some(arg) = strip_prefix_ignore_case(message, FACT_PREFIX) {
            return Some(SessionCommand::Fact(arg.trim().to_string()));
        }
        if message.eq_ignore_ascii_case(CLEAR_COMMAND) {
            return Some(SessionCommand::ClearContext);
        }
        None
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
