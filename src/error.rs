//! Error types for the pdf-lesson-client library.
//!
//! Two distinct error types reflect two distinct failure layers:
//!
//! * [`SessionError`]: anything that crosses an I/O boundary or the session
//!   state machine: transport failures mapped from HTTP status codes, document
//!   load failures, poll exhaustion, stale results.
//!
//! * [`RangeError`]: purely local page-range validation. These never reach
//!   the network: submission is gated on the range being valid, and a rejected
//!   range is wrapped in [`SessionError::InvalidRange`] only when the caller
//!   tried to submit it anyway.
//!
//! Nothing here is fatal to the process. Every variant is recoverable by the
//! user re-selecting a source, re-submitting a range, or restarting a poll.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the document session, the remote API client and the
/// job poll engine.
#[derive(Debug, Error)]
pub enum SessionError {
    // ── Transport errors ──────────────────────────────────────────────────
    /// No connection could be made to the backend (refused, DNS, timeout).
    #[error("Unable to reach '{url}': {reason}\nCheck that the backend is running.")]
    TransportUnreachable { url: String, reason: String },

    /// HTTP 404: the document or job does not exist (any more).
    #[error("Resource not found: '{url}'")]
    NotFound { url: String },

    /// HTTP 400: the server rejected the request, usually with a validation message.
    #[error("Bad request: {detail}")]
    BadRequest { detail: String },

    /// HTTP 409: e.g. downloading the result of a job that has not finished.
    #[error("Conflict: {detail}")]
    Conflict { detail: String },

    /// HTTP 5xx.
    #[error("Server error (HTTP {status}). Please try again later.")]
    ServerError { status: u16 },

    /// Any other non-success HTTP status.
    #[error("Server returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body could not be decoded into the expected schema.
    #[error("Invalid response from '{url}': {detail}")]
    InvalidResponse { url: String, detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document bytes could not be fetched, recognised or opened.
    #[error("Failed to load document {origin}: {reason}")]
    DocumentLoadFailed { origin: String, reason: String },

    /// The PDF is encrypted; this client never supplies passwords.
    #[error("Document {origin} is encrypted and requires a password")]
    PasswordRequired { origin: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the pdfium shared library (or the directory containing it)."
    )]
    PdfiumBindingFailed(String),

    // ── Poll errors ───────────────────────────────────────────────────────
    /// The attempt budget was spent without the job reaching a terminal state.
    ///
    /// This is a client-side give-up; the job may still be running server-side.
    #[error("Gave up polling job '{job_id}' after {attempts} checks; it may still be running")]
    PollExhausted { job_id: String, attempts: u32 },

    /// The poll was cancelled before the job reached a terminal state.
    #[error("Polling of job '{job_id}' was cancelled")]
    PollCancelled { job_id: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// A page range was submitted that does not pass validation.
    #[error("Invalid page range: {0}")]
    InvalidRange(#[from] RangeError),

    /// An operation needs a loaded document and none is loaded.
    #[error("No document is loaded")]
    NoDocumentLoaded,

    /// A newer source was selected while this operation was in flight.
    #[error("Result of generation {generation} discarded: a newer document was selected")]
    Superseded { generation: u64 },

    // ── I/O and config errors ─────────────────────────────────────────────
    /// Could not write a downloaded artifact or rendered page.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Whether a failed status check should end the poll loop.
    ///
    /// Only `NotFound` does: the job no longer exists, so further checks
    /// cannot succeed. Every other transport failure is transient.
    pub fn stops_polling(&self) -> bool {
        matches!(self, SessionError::NotFound { .. })
    }

    /// Whether the error came from the transport layer (HTTP or connection).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SessionError::TransportUnreachable { .. }
                | SessionError::NotFound { .. }
                | SessionError::BadRequest { .. }
                | SessionError::Conflict { .. }
                | SessionError::ServerError { .. }
                | SessionError::UnexpectedStatus { .. }
                | SessionError::InvalidResponse { .. }
        )
    }
}

/// Local page-range validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RangeError {
    /// One or both fields are empty. Not shown to the user; submission is just disabled.
    #[error("both 'from' and 'to' are required")]
    Incomplete,

    /// `from` is greater than `to`.
    #[error("'from' page must be less than or equal to 'to' page")]
    RangeOrder,

    /// A page lies beyond the document's page count.
    #[error("page range exceeds the document's {page_count} pages")]
    RangeBounds { page_count: u32 },

    /// A field is below the minimum page number of 1.
    #[error("page numbers start at 1")]
    BelowMinimum,

    /// The document's page count is not known yet.
    #[error("the document has not finished loading")]
    NoDocument,
}
