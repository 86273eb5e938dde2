//! Speech synthesis pass-through (ElevenLabs text-to-speech).

use crate::config::SpeechSettings;
use crate::error::SpeechError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Content type of the audio returned by [`SpeechSynthesizer::synthesize`].
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Backend that turns text into MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// ElevenLabs client. The API key and voice id come from configuration only.
#[derive(Debug, Clone)]
pub struct ElevenLabsTts {
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    stability: f64,
    similarity_boost: f64,
    client: reqwest::Client,
}

impl ElevenLabsTts {
    /// Fails with [`SpeechError::NotConfigured`] when the key or voice is missing.
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self, SpeechError> {
        let api_key = required(settings.api_key.as_deref())?;
        let voice_id = required(settings.voice_id.as_deref())?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id,
            model_id: settings.model_id.clone(),
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        }
    }
}

fn required(value: Option<&str>) -> Result<String, SpeechError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(SpeechError::NotConfigured)
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let res = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::ACCEPT, AUDIO_MPEG)
            .header("xi-api-key", &self.api_key)
            .json(&self.request_body(text))
            .send()
            .await?;

        // Only 200 carries audio; anything else is relayed to the caller as-is.
        let status = res.status();
        if status != reqwest::StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(SpeechError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.bytes().await?.to_vec())
    }
}
