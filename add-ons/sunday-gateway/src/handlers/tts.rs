//! `POST /tts`: text in, MP3 out.

use super::{api_error, internal};
use crate::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sunday_core::speech::AUDIO_MPEG;
use sunday_core::SpeechError;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
}

pub async fn tts(State(state): State<AppState>, Json(body): Json<TtsRequest>) -> Response {
    if body.text.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "No text provided").into_response();
    }
    let Some(speech) = state.speech.as_ref() else {
        return internal(SpeechError::NotConfigured).into_response();
    };

    match speech.synthesize(&body.text).await {
        Ok(audio) => {
            tracing::debug!(target: "sunday::tts", bytes = audio.len(), "Speech synthesized");
            ([(header::CONTENT_TYPE, AUDIO_MPEG)], audio).into_response()
        }
        Err(SpeechError::Upstream { status, body }) => {
            tracing::warn!(target: "sunday::tts", status, "Speech API error: {}", body);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            api_error(status, body).into_response()
        }
        Err(e) => {
            tracing::error!(target: "sunday::tts", "Speech request failed: {}", e);
            internal(e).into_response()
        }
    }
}
