//! Framework-synthesized failures.
//!
//! Every error the dispatch pipeline can produce on its own (as opposed to a
//! response a handler built) is a [`DispatchError`]. Each variant knows its
//! status code, the short message placed in the envelope, and an optional
//! detail string. Converting one into a response stamps a fresh correlation id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::ResponseEnvelope;

/// A request-level failure, rendered as `{ok: false, error: {...}}`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The decoded path contains a `..` sequence.
    #[error("path '{0}' contains a traversal sequence")]
    Traversal(String),

    /// No unit or routine matches the path.
    #[error("no handler for '{0}'")]
    NotFound(String),

    /// A GET path with no file behind it.
    #[error("no file for '{0}'")]
    FileNotFound(String),

    #[error("method {0} is not allowed")]
    MethodNotAllowed(String),

    /// Declared or actual body size above the configured cap.
    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// A unit exists at the exact path but does not define `handle_request`.
    #[error("unit '{unit}' does not define handle_request")]
    MissingEntrypoint { unit: String },

    /// A unit could not be loaded and no earlier version is available.
    #[error("failed to load unit '{unit}': {detail}")]
    UnitLoad { unit: String, detail: String },

    /// The routine raised an error while running.
    #[error("routine '{routine}' in '{unit}' failed: {detail}")]
    Handler {
        unit: String,
        routine: String,
        detail: String,
    },

    /// Static file could not be read.
    #[error("failed to read file: {0}")]
    FileRead(String),

    /// A blocking task panicked or was cancelled.
    #[error("internal failure: {0}")]
    Internal(String),

    /// Admission is no longer possible (shutdown in progress).
    #[error("server is shutting down")]
    Unavailable,
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Traversal(_) | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::FileNotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingEntrypoint { .. }
            | Self::UnitLoad { .. }
            | Self::Handler { .. }
            | Self::FileRead(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short, stable message for the envelope.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Traversal(_) => "Bad Request",
            Self::NotFound(_) => "Not Found",
            Self::FileNotFound(_) => "File Not Found",
            Self::MethodNotAllowed(_) => "Method Not Allowed",
            Self::PayloadTooLarge { .. } => "Payload Too Large",
            Self::BodyRead(_) => "Bad Request",
            Self::MissingEntrypoint { .. } => "Missing handle_request",
            Self::UnitLoad { .. } => "Unit Load Error",
            Self::Handler { .. } => "Handler Error",
            Self::FileRead(_) | Self::Internal(_) => "Server Error",
            Self::Unavailable => "Service Unavailable",
        }
    }

    /// Detail string for the envelope. Client errors stay terse.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Traversal(_) => Some("path traversal is not allowed".to_string()),
            Self::NotFound(_) | Self::FileNotFound(_) | Self::Unavailable => None,
            Self::MethodNotAllowed(method) => Some(format!("{method} is not supported")),
            Self::PayloadTooLarge { limit } => {
                Some(format!("body exceeds the {limit} byte limit"))
            }
            Self::BodyRead(_) => Some("request body could not be read".to_string()),
            Self::MissingEntrypoint { unit } => {
                Some(format!("unit '{unit}' must define fn handle_request(request)"))
            }
            Self::UnitLoad { detail, .. } => Some(detail.clone()),
            Self::Handler { detail, .. } => Some(detail.clone()),
            Self::FileRead(_) | Self::Internal(_) => None,
        }
    }

    /// Build the error envelope with a fresh correlation id.
    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::error(self.status(), self.message(), self.detail())
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let envelope = self.to_envelope();
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                request_id = envelope.request_id().unwrap_or("-"),
                status = status.as_u16(),
                error = %self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                request_id = envelope.request_id().unwrap_or("-"),
                status = status.as_u16(),
                error = %self,
                "Request rejected"
            );
        }
        envelope.into_response()
    }
}
