//! Error types for the ingestion pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for docai operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Source file or directory does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No stored document with this id
    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    /// File suffix is not one of the supported formats
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The file exists but no text could be produced from it
    #[error("Failed to extract text from '{path}': {message}")]
    ExtractionFailed { path: String, message: String },

    /// Remote text refinement failed
    #[error("Enhancement failed: {0}")]
    EnhancementFailed(String),

    /// Storage rejected a read or write
    #[error("Persistence error: {0}")]
    PersistenceFailed(String),

    /// Caller contract violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an enhancement error
    pub fn enhancement(message: impl Into<String>) -> Self {
        Self::EnhancementFailed(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailed(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable name used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::DocumentNotFound(_) => "not_found",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::ExtractionFailed { .. } => "extraction_failed",
            Error::EnhancementFailed(_) => "enhancement_failed",
            Error::PersistenceFailed(_) => "persistence_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) | Error::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            Error::UnsupportedFormat(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::ExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::EnhancementFailed(_) => StatusCode::BAD_GATEWAY,
            Error::PersistenceFailed(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::PersistenceFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
