//! Error types shared across the store, the LLM adapter, configuration loading
//! and the HTTP layer.
//!
//! Each component owns a small enum; [`AppError`] is the boundary type the
//! HTTP handlers return, and it knows how to render itself as the
//! `{ "success": false, "error": "..." }` envelope with the matching status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures from the on-disk style guide store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No `<name>.md` file exists in the store directory.
    #[error("Style guide '{0}' not found")]
    NotFound(String),

    /// The requested name is empty once disallowed characters are removed.
    #[error("Invalid style guide name")]
    InvalidName,

    /// Reading, writing or listing the directory failed.
    #[error("style guide storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by the adapter itself, as opposed to provider failures,
/// which come back as [`crate::api::CompletionResult::Failure`].
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key was configured at startup.
    #[error("OpenAI client not initialized")]
    NotInitialized,

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The completion request could not be assembled.
    #[error("failed to build completion request: {0}")]
    Request(String),

    /// A prompt template override could not be read or parsed.
    #[error("invalid prompt template {path}: {message}")]
    Template {
        /// Path of the offending template file.
        path: String,
        /// Reader or parser message.
        message: String,
    },
}

/// Failures while reading the YAML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration YAML.
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// The per-platform configuration directory could not be determined.
    #[error("unable to determine config directory")]
    NoConfigDir,
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The provider call failed; the message is passed through verbatim.
    #[error("{0}")]
    Upstream(String),
}

impl AppError {
    /// Status code the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::InvalidName) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Llm(_) | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}
