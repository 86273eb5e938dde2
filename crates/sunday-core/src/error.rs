//! Error types for the Sunday core library.

use thiserror::Error;

/// Errors raised by the on-disk history store.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while reading the knowledge base documents.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("cannot read knowledge document {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list knowledge directory {path}: {source}")]
    List {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading persona prompt files.
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("cannot read persona prompt {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the chat-completion API.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion response parse failed: {0}")]
    Parse(String),

    #[error("completion returned no message content")]
    EmptyReply,
}

/// Errors from the speech-synthesis API.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Upstream answered with a non-200 status; body is kept verbatim.
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("speech request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("speech synthesis is not configured")]
    NotConfigured,
}

/// Errors from one chat exchange.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
