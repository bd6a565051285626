//! Error types for the request surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dockmock_core::SimError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for request handling.
pub type Result<T> = std::result::Result<T, DockerError>;

/// Broad category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown container or image.
    NotFound,
    /// Operation illegal in the resource's current state.
    InvalidState,
    /// No route matches the request.
    Unrecognized,
    /// The request body or query could not be understood.
    Malformed,
    /// Failure inside the simulator itself.
    Internal,
}

/// Errors returned for a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DockerError {
    /// The simulator refused the operation.
    #[error("{path}: {source}")]
    Rejected {
        /// Request path.
        path: String,
        /// Why the simulator refused.
        #[source]
        source: SimError,
    },

    /// No route matches the path.
    #[error("Unrecognized: {0}")]
    Unrecognized(String),

    /// The request could not be parsed.
    #[error("{path}: malformed request: {reason}")]
    Malformed {
        /// Request path.
        path: String,
        /// What was wrong.
        reason: String,
    },
}

impl DockerError {
    /// Wraps a simulator error with the request path.
    #[must_use]
    pub fn rejected(path: impl Into<String>, source: SimError) -> Self {
        Self::Rejected {
            path: path.into(),
            source,
        }
    }

    /// Creates a new malformed request error.
    #[must_use]
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { source, .. } => match source {
                SimError::ContainerNotFound(_) | SimError::ImageNotFound(_) => ErrorKind::NotFound,
                SimError::InvalidState { .. } => ErrorKind::InvalidState,
                SimError::Runtime(_) => ErrorKind::Internal,
            },
            Self::Unrecognized(_) => ErrorKind::Unrecognized,
            Self::Malformed { .. } => ErrorKind::Malformed,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::Unrecognized => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Malformed => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub message: String,
}

impl IntoResponse for DockerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            message: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_errors_carry_path_and_id() {
        let err = DockerError::rejected(
            "/containers/abc/start",
            SimError::invalid_state("abc", "already running"),
        );
        assert_eq!(
            err.to_string(),
            "/containers/abc/start: container abc: already running"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn kinds_map_to_status_codes() {
        let not_found = DockerError::rejected("/images/x", SimError::ImageNotFound("x".into()));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let unrecognized = DockerError::Unrecognized("/volumes".into());
        assert_eq!(unrecognized.kind(), ErrorKind::Unrecognized);
        assert_eq!(unrecognized.to_string(), "Unrecognized: /volumes");

        let malformed = DockerError::malformed("/containers/create", "missing Image");
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
    }
}
