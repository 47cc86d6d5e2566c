//! Centralized error types for the HTTP streaming protocol handler.
//!
//! Unlike a JSON API, every error here ends up as an HTML body —
//! [`HttpProtoError::status`] supplies the code/reason pair the handlers
//! feed straight into [`crate::html::html_response`].

use thiserror::Error;

/// Taxonomy of recoverable request-handling errors. Each
/// variant carries exactly the context needed to render its response body;
/// nothing here is fatal to the server process — the connection that raised
/// it gets unlinked, nothing else is affected.
#[derive(Debug, Error)]
pub enum HttpProtoError {
    /// Non-GET method or an unparseable request line.
    #[error("Internal Server Error")]
    MalformedRequest,

    /// `/listen/source/<name>` named a source the core doesn't have.
    #[error("Source not found")]
    SourceNotFound,

    /// The core refused to create a source-output subscription (source
    /// suspended, spec mismatch, or any other admission refusal).
    #[error("Cannot create source output")]
    CannotCreateSourceOutput,

    /// No dispatcher rule matched the requested path.
    #[error("Not Found")]
    UnknownUrl,

    /// A module boundary received a state that should be statically
    /// unreachable: surfaced as a 500 instead of panicking the connection
    /// task.
    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl HttpProtoError {
    /// `(status code, reason phrase)` for the HTTP response headers.
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            HttpProtoError::MalformedRequest => (500, "Internal Server Error"),
            HttpProtoError::SourceNotFound => (404, "Source not found"),
            HttpProtoError::CannotCreateSourceOutput => (403, "Cannot create source output"),
            HttpProtoError::UnknownUrl => (404, "Not Found"),
            HttpProtoError::Internal(_) => (500, "Internal Server Error"),
        }
    }
}

/// Errors the audio core can hand back when asked to create a source-output
/// subscription.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no such source")]
    NoSuchSource,
    #[error("source is suspended")]
    SourceSuspended,
}

impl From<CoreError> for HttpProtoError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoSuchSource => HttpProtoError::SourceNotFound,
            CoreError::SourceSuspended => HttpProtoError::CannotCreateSourceOutput,
        }
    }
}
