//! `POST /chat`: session commands, or a completion call recorded in history.

use super::{internal, ApiError};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state
        .companion
        .handle_message(&body.message)
        .await
        .map_err(internal)?;
    Ok(Json(ChatResponse {
        response: outcome.text().to_string(),
    }))
}
