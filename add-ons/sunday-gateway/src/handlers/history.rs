//! `GET /history` and `POST /clear`.

use super::{internal, ApiError};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use sunday_core::Turn;

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<Turn>> {
    Json(state.companion.load_history().await)
}

pub async fn clear_history(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.companion.clear_history().await.map_err(|e| {
        tracing::error!(target: "sunday::history", "Clear failed: {}", e);
        internal(e)
    })?;
    Ok(Json(json!({ "status": "success" })))
}
