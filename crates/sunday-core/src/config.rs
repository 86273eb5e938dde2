//! Gateway configuration.
//!
//! Precedence (lowest first): built-in defaults, optional TOML file (`SUNDAY_CONFIG`, else
//! `config/sunday.toml` when present), `SUNDAY__*` environment variables, then the plain
//! environment variables a `.env` file usually carries:
//!
//! | Env | Applies to |
//! |-----|------------|
//! | PORT | `port` |
//! | AI_BACKEND | `completion.backend` (`ollama`, anything else selects OpenAI) |
//! | OLLAMA_BASE_URL | `completion.base_url` when the backend is Ollama |
//! | OPENAI_API_KEY / OPENAI_MODEL / OPENAI_BASE_URL | `completion.*` when the backend is OpenAI |
//! | ELEVENLABS_API_KEY / ELEVENLABS_VOICE_ID | `speech.api_key` / `speech.voice_id` |
//! | PERSONA_TRIGGER_NAME | `persona.trigger_name` |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_API_KEY: &str = "ollama";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2-vision:11b";
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const ELEVENLABS_DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const ELEVENLABS_DEFAULT_MODEL: &str = "eleven_multilingual_v2";

const DEFAULT_CONFIG_NAME: &str = "config/sunday";

fn default_temperature() -> f64 {
    0.9
}

fn default_stability() -> f64 {
    0.5
}

fn default_similarity_boost() -> f64 {
    0.75
}

fn default_speech_base_url() -> String {
    ELEVENLABS_DEFAULT_BASE_URL.to_string()
}

fn default_speech_model() -> String {
    ELEVENLABS_DEFAULT_MODEL.to_string()
}

/// Which completion service the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompletionBackend {
    /// Self-hosted Ollama exposing the OpenAI-compatible API.
    #[default]
    Ollama,
    /// Hosted OpenAI API.
    OpenAi,
}

impl CompletionBackend {
    /// `ollama` (any case) selects Ollama; every other value selects OpenAI.
    pub fn from_name(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("ollama") {
            CompletionBackend::Ollama
        } else {
            CompletionBackend::OpenAi
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionBackend::Ollama => "ollama",
            CompletionBackend::OpenAi => "openai",
        }
    }
}

impl From<String> for CompletionBackend {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<CompletionBackend> for String {
    fn from(b: CompletionBackend) -> Self {
        b.as_str().to_string()
    }
}

/// Completion API settings. Unset fields resolve per backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub backend: CompletionBackend,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Request timeout; `None` keeps the HTTP client default (no timeout).
    pub timeout_secs: Option<u64>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            backend: CompletionBackend::default(),
            base_url: None,
            api_key: None,
            model: None,
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

impl CompletionSettings {
    pub fn resolved_base_url(&self) -> String {
        non_empty(self.base_url.as_deref())
            .unwrap_or(match self.backend {
                CompletionBackend::Ollama => OLLAMA_DEFAULT_BASE_URL,
                CompletionBackend::OpenAi => OPENAI_DEFAULT_BASE_URL,
            })
            .trim_end_matches('/')
            .to_string()
    }

    /// Ollama ignores the key but the OpenAI-compatible endpoint still expects one.
    pub fn resolved_api_key(&self) -> Option<String> {
        match (non_empty(self.api_key.as_deref()), self.backend) {
            (Some(k), _) => Some(k.to_string()),
            (None, CompletionBackend::Ollama) => Some(OLLAMA_API_KEY.to_string()),
            (None, CompletionBackend::OpenAi) => None,
        }
    }

    pub fn resolved_model(&self) -> String {
        non_empty(self.model.as_deref())
            .unwrap_or(match self.backend {
                CompletionBackend::Ollama => OLLAMA_DEFAULT_MODEL,
                CompletionBackend::OpenAi => OPENAI_DEFAULT_MODEL,
            })
            .to_string()
    }
}

/// Speech-synthesis (ElevenLabs-style) settings. Key and voice are secrets supplied externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
    #[serde(default = "default_speech_model")]
    pub model_id: String,
    #[serde(default = "default_stability")]
    pub stability: f64,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f64,
    pub timeout_secs: Option<u64>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            api_key: None,
            voice_id: None,
            model_id: default_speech_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            timeout_secs: None,
        }
    }
}

impl SpeechSettings {
    /// True when both the key and the voice are present.
    pub fn is_configured(&self) -> bool {
        non_empty(self.api_key.as_deref()).is_some() && non_empty(self.voice_id.as_deref()).is_some()
    }
}

/// Persona selection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// User name that switches to the name-specific persona. `None` disables it.
    pub trigger_name: Option<String>,
    /// Replaces the built-in generic persona text.
    pub generic_prompt_file: Option<PathBuf>,
    /// Replaces the built-in name-specific template (`{name}` is substituted).
    pub named_prompt_file: Option<PathBuf>,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub history_file: PathBuf,
    pub documents_dir: PathBuf,
    pub static_dir: PathBuf,
    pub assets_dir: PathBuf,
    /// Serve `/`, `/assets/*` and the static fallback.
    pub frontend_enabled: bool,
    #[serde(default)]
    pub completion: CompletionSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub persona: PersonaSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            history_file: PathBuf::from("chat_history.json"),
            documents_dir: PathBuf::from("documents"),
            static_dir: PathBuf::from("static"),
            assets_dir: PathBuf::from("static/assets"),
            frontend_enabled: true,
            completion: CompletionSettings::default(),
            speech: SpeechSettings::default(),
            persona: PersonaSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Load config from file and environment (see module docs for precedence).
    pub fn load() -> Result<Self, config::ConfigError> {
        let file = match env_opt_string("SUNDAY_CONFIG") {
            Some(path) => config::File::from(PathBuf::from(path)).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let mut cfg = Self::build(file)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults (and `SUNDAY__*` env). No plain env overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from_str(toml, config::FileFormat::Toml))
    }

    fn build<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let d = Self::default();
        config::Config::builder()
            .set_default("host", d.host)?
            .set_default("port", i64::from(d.port))?
            .set_default("history_file", d.history_file.to_string_lossy().into_owned())?
            .set_default("documents_dir", d.documents_dir.to_string_lossy().into_owned())?
            .set_default("static_dir", d.static_dir.to_string_lossy().into_owned())?
            .set_default("assets_dir", d.assets_dir.to_string_lossy().into_owned())?
            .set_default("frontend_enabled", d.frontend_enabled)?
            .add_source(source)
            .add_source(config::Environment::with_prefix("SUNDAY").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Apply the plain environment variables listed in the module docs.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(env_opt_string);
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an injectable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(backend) = lookup("AI_BACKEND") {
            self.completion.backend = CompletionBackend::from_name(&backend);
        }
        match self.completion.backend {
            CompletionBackend::Ollama => {
                if let Some(url) = lookup("OLLAMA_BASE_URL") {
                    self.completion.base_url = Some(url);
                }
            }
            CompletionBackend::OpenAi => {
                if let Some(key) = lookup("OPENAI_API_KEY") {
                    self.completion.api_key = Some(key);
                }
                if let Some(model) = lookup("OPENAI_MODEL") {
                    self.completion.model = Some(model);
                }
                if let Some(url) = lookup("OPENAI_BASE_URL") {
                    self.completion.base_url = Some(url);
                }
            }
        }
        if let Some(key) = lookup("ELEVENLABS_API_KEY") {
            self.speech.api_key = Some(key);
        }
        if let Some(voice) = lookup("ELEVENLABS_VOICE_ID") {
            self.speech.voice_id = Some(voice);
        }
        if let Some(name) = lookup("PERSONA_TRIGGER_NAME") {
            self.persona.trigger_name = Some(name);
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TOML rendering with every secret masked, for `--verify` and startup logs.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        shown.completion.api_key = shown.completion.api_key.as_deref().map(mask_secret);
        shown.speech.api_key = shown.speech.api_key.as_deref().map(mask_secret);
        shown.speech.voice_id = shown.speech.voice_id.as_deref().map(mask_secret);
        toml::to_string_pretty(&shown)
    }
}

/// Keep the first and last four characters of long secrets; hide short ones entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.trim().chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_resolve_to_local_ollama() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.completion.backend, CompletionBackend::Ollama);
        assert_eq!(cfg.completion.resolved_base_url(), OLLAMA_DEFAULT_BASE_URL);
        assert_eq!(cfg.completion.resolved_model(), OLLAMA_DEFAULT_MODEL);
        assert_eq!(cfg.completion.resolved_api_key().as_deref(), Some("ollama"));
        assert!((cfg.completion.temperature - 0.9).abs() < f64::EPSILON);
        assert!(!cfg.speech.is_configured());
    }

    #[test]
    fn ai_backend_switches_to_openai_and_reads_openai_vars() {
        let mut cfg = GatewayConfig::default();
        cfg.apply_overrides_from(lookup_from(&[
            ("AI_BACKEND", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OLLAMA_BASE_URL", "http://ignored:1/v1"),
            ("PORT", "8080"),
        ]));
        assert_eq!(cfg.completion.backend, CompletionBackend::OpenAi);
        assert_eq!(cfg.completion.resolved_base_url(), OPENAI_DEFAULT_BASE_URL);
        assert_eq!(cfg.completion.resolved_model(), "gpt-4o");
        assert_eq!(cfg.completion.resolved_api_key().as_deref(), Some("sk-test"));
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn openai_without_key_resolves_to_none() {
        let mut cfg = GatewayConfig::default();
        cfg.apply_overrides_from(lookup_from(&[("AI_BACKEND", "openai")]));
        assert_eq!(cfg.completion.resolved_api_key(), None);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let cfg = GatewayConfig::from_toml_str(
            r#"
port = 7000
history_file = "data/history.json"

[completion]
backend = "openai"
model = "gpt-4.1-mini"
temperature = 0.4

[persona]
trigger_name = "sharif"
"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.history_file, PathBuf::from("data/history.json"));
        assert_eq!(cfg.documents_dir, PathBuf::from("documents"));
        assert_eq!(cfg.completion.backend, CompletionBackend::OpenAi);
        assert_eq!(cfg.completion.resolved_model(), "gpt-4.1-mini");
        assert!((cfg.completion.temperature - 0.4).abs() < 1e-9);
        assert_eq!(cfg.persona.trigger_name.as_deref(), Some("sharif"));
        assert_eq!(cfg.speech.model_id, ELEVENLABS_DEFAULT_MODEL);
    }

    #[test]
    fn redacted_toml_hides_secrets() {
        let mut cfg = GatewayConfig::default();
        cfg.speech.api_key = Some("sk_0123456789abcdef0123".to_string());
        cfg.speech.voice_id = Some("voice".to_string());
        let out = cfg.to_redacted_toml().unwrap();
        assert!(!out.contains("sk_0123456789abcdef0123"));
        assert!(out.contains("sk_0…0123"));
        assert!(!out.contains("\"voice\""));
    }

    #[test]
    fn mask_secret_hides_short_values() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("abcdefghijklmnop"), "abcd…mnop");
    }
}
