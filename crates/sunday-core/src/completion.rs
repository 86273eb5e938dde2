//! Chat-completion client for OpenAI-compatible APIs (self-hosted Ollama or hosted OpenAI).
//!
//! One request per call, a single choice, no retries.

use crate::config::CompletionSettings;
use crate::error::CompletionError;
use crate::prompt::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anything that turns a message list into one assistant reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw reply text (untrimmed).
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<String, CompletionError>;

    /// Model identifier, for logs and health output.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    n: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// `POST {base_url}/chat/completions` with a bearer key.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, CompletionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            model: model.into(),
            client: builder.build()?,
        })
    }

    pub fn from_settings(settings: &CompletionSettings) -> Result<Self, CompletionError> {
        Self::new(
            settings.resolved_base_url(),
            settings.resolved_api_key(),
            settings.resolved_model(),
            settings.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            n: 1,
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| CompletionError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(CompletionError::EmptyReply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
