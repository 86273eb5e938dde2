//! HTTP handlers. Errors leave as `{"error": "<message>"}` with the matching status.

pub mod chat;
pub mod history;
pub mod status;
pub mod tts;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub fn internal(message: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}
