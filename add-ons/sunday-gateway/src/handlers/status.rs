//! Health, conversation-context view, and knowledge reload.

use super::{internal, ApiError};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use sunday_core::ContextSnapshot;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": sunday_core::version(),
        "backend": state.config.completion.backend.as_str(),
        "model": state.companion.completion().model(),
    }))
}

pub async fn context(State(state): State<AppState>) -> Json<ContextSnapshot> {
    Json(state.companion.snapshot().await)
}

pub async fn reload_knowledge(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (documents, chars) = state
        .companion
        .reload_knowledge(&state.config.documents_dir)
        .await
        .map_err(|e| {
            tracing::error!(target: "sunday::knowledge", "Reload failed: {}", e);
            internal(e)
        })?;
    Ok(Json(json!({
        "status": "success",
        "documents": documents,
        "chars": chars,
    })))
}
