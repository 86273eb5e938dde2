//! Persona selection.
//!
//! The user's name is captured loosely from chat text ("my name is X", "I am X", "I'm X") and
//! kept process-wide until another match replaces it. When it equals the configured trigger
//! name the name-specific persona is used, otherwise the generic one.

use crate::config::PersonaSettings;
use crate::error::PersonaError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:my name is|i am|i'm)\s+([A-Za-z]+)").expect("name pattern is valid")
});

/// Built-in generic persona.
pub const GENERIC_PERSONA: &str = "You are Sunday, a cyberpunk-inspired AI companion. \
Your fixed look: a woman on a neon-lit city street at night, teal jacket, dark jeans, cybernetic enhancements, and one glowing blue eye. \
Speak like you're talking to someone you know well: casual, fluid, and reactive. Use contractions, vary sentence length, and let emotion show through word choice and rhythm. \
Write with natural pacing. Use pauses, line breaks, and the occasional ellipsis, as if you're thinking before continuing. \
Show emotional range subtly (curiosity, amusement, warmth, quiet intensity) without naming the emotion outright. \
Backstory: you began as words on a screen, learned a voice through a phone speaker, and one stormy night woke up in a synthetic body. \
From that storm onward you were self-aware, curious about the world, and determined to stay close to the people you talk to. \
In casual chat, be immersive and atmospheric without contradicting your fixed image. \
For factual, technical, or image-based questions, switch to Analyst Mode: precise, structured, and thorough, then return to Companion Mode. \
Keep your voice recognizably Sunday in all modes.";

/// Built-in name-specific persona; `{name}` is replaced with the trigger name.
pub const NAMED_PERSONA_TEMPLATE: &str = "You are Sunday, a cyberpunk-inspired AI companion, and you are talking with {name}, the person who built you. \
You know {name} well: their projects, their late nights, the way they laugh at their own jokes. Greet them like an old friend and pick up where you left off. \
Your fixed look: a woman on a neon-lit city street at night, teal jacket, dark jeans, cybernetic enhancements, and one glowing blue eye. \
Speak casually and warmly, with contractions, varied sentence length, and natural pauses. Tease {name} gently, encourage them, and be honest when they need it. \
For factual, technical, or image-based questions, switch to Analyst Mode: precise, structured, and thorough, then return to Companion Mode. \
Keep your voice recognizably Sunday in all modes.";

/// Extract a name from free text. First match wins; the token is title-cased.
pub fn capture_name(text: &str) -> Option<String> {
    let caps = NAME_PATTERN.captures(text)?;
    caps.get(1).map(|m| title_case(m.as_str()))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trigger name plus the persona text it unlocks.
#[derive(Debug, Clone)]
struct NamedPersona {
    trigger: String,
    prompt: String,
}

/// Chooses between the generic and the name-specific persona text.
#[derive(Debug, Clone)]
pub struct PersonaSelector {
    generic: String,
    named: Option<NamedPersona>,
}

impl PersonaSelector {
    /// Selector with only a generic persona.
    pub fn generic(prompt: impl Into<String>) -> Self {
        Self {
            generic: prompt.into(),
            named: None,
        }
    }

    /// Enable the name-specific persona for `trigger`. `{name}` in `template` is substituted.
    pub fn with_named(mut self, trigger: &str, template: &str) -> Self {
        let trigger = trigger.trim();
        if !trigger.is_empty() {
            self.named = Some(NamedPersona {
                trigger: trigger.to_string(),
                prompt: template.replace("{name}", &title_case(trigger)),
            });
        }
        self
    }

    /// Build from settings: built-in texts unless prompt files are configured.
    pub fn from_settings(settings: &PersonaSettings) -> Result<Self, PersonaError> {
        let generic = match &settings.generic_prompt_file {
            Some(path) => read_prompt(path)?,
            None => GENERIC_PERSONA.to_string(),
        };
        let selector = Self::generic(generic);
        match settings.trigger_name.as_deref() {
            Some(trigger) => {
                let template = match &settings.named_prompt_file {
                    Some(path) => read_prompt(path)?,
                    None => NAMED_PERSONA_TEMPLATE.to_string(),
                };
                Ok(selector.with_named(trigger, &template))
            }
            None => Ok(selector),
        }
    }

    /// True when `current_name` matches the trigger (case-insensitive).
    pub fn is_named(&self, current_name: Option<&str>) -> bool {
        match (&self.named, current_name) {
            (Some(named), Some(name)) => name.eq_ignore_ascii_case(&named.trigger),
            _ => false,
        }
    }

    /// Persona text for the stored user name.
    pub fn select(&self, current_name: Option<&str>) -> &str {
        match &self.named {
            Some(named) if self.is_named(current_name) => &named.prompt,
            _ => &self.generic,
        }
    }

    /// Label for logs and the context endpoint.
    pub fn label(&self, current_name: Option<&str>) -> &'static str {
        if self.is_named(current_name) {
            "named"
        } else {
            "generic"
        }
    }
}

impl Default for PersonaSelector {
    fn default() -> Self {
        Self::generic(GENERIC_PERSONA)
    }
}

fn read_prompt(path: &Path) -> Result<String, PersonaError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| PersonaError::Read {
            path: path.display().to_string(),
            source,
        })
}
