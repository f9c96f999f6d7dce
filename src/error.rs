//! Error taxonomy for the library core.
//!
//! Component-level checks (ownership, duplication, existence) raise typed
//! errors at the point of detection; the HTTP boundary maps them to status
//! codes via the [`IntoResponse`] impl. Storage and filesystem faults are
//! returned with a generic body so internals never reach the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors produced by the library core.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Missing or invalid input. No side effects were performed.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requesting principal does not own the playlist.
    #[error("access denied: you are not the owner of this playlist")]
    Forbidden,

    /// The song is already a member of the playlist.
    #[error("song is already in the playlist")]
    DuplicateMember,

    /// No authenticated principal was supplied.
    #[error("authentication required")]
    Unauthorized,

    /// Asset or record persistence failed during upload. Any partially
    /// written assets have already been rolled back.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored playlist row could not be decoded.
    #[error("corrupt playlist record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl LibraryError {
    /// HTTP status code this error maps to at the boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            LibraryError::Validation(_) | LibraryError::DuplicateMember => {
                StatusCode::BAD_REQUEST
            }
            LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
            LibraryError::Forbidden => StatusCode::FORBIDDEN,
            LibraryError::Unauthorized => StatusCode::UNAUTHORIZED,
            LibraryError::Ingestion(_)
            | LibraryError::Storage(_)
            | LibraryError::Io(_)
            | LibraryError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body shape consumed by the frontend.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal faults keep their details in the log, not the response.
        let message = match &self {
            LibraryError::Storage(_) | LibraryError::Io(_) | LibraryError::Corrupt(_) => {
                tracing::error!(error = %self, "internal error");
                "internal server error".to_string()
            }
            LibraryError::Ingestion(_) => {
                tracing::error!(error = %self, "ingestion error");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
