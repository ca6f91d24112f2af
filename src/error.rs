//! Error types for the syllabus-analyzer library.
//!
//! Two error types mirror the two layers of the pipeline:
//!
//! * [`ExtractionError`]: a single format strategy failed (corrupt PDF,
//!   unreadable image, OCR process crashed, bytes that are not UTF-8).
//!   Produced by [`crate::pipeline::extract`] and its backends.
//!
//! * [`SyllabusError`]: **fatal** for one request. Every stage of
//!   [`crate::service::AnalysisService`] returns this type; the HTTP layer
//!   maps it to a status code with [`SyllabusError::status_code`].
//!
//! Messages are written for the end user: they end up verbatim in the
//! `error` field of the JSON error payload.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one extraction strategy.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Both the text layer and OCR produced nothing but whitespace.
    #[error("No text extracted from {kind}")]
    EmptyExtraction { kind: &'static str },

    /// Plain-text upload is not valid UTF-8.
    #[error("File is not valid UTF-8 text: {source}")]
    Decode {
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The temporary upload could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium could not be bound, or rejected the document.
    #[error("PDF extraction failed: {detail}")]
    Pdf { detail: String },

    /// The DOCX container or its XML could not be parsed.
    #[error("DOCX extraction failed: {detail}")]
    Docx { detail: String },

    /// The image could not be decoded or re-encoded for OCR.
    #[error("Image decoding failed: {detail}")]
    Image { detail: String },

    /// The OCR engine failed to start or exited unsuccessfully.
    #[error("OCR failed: {detail}")]
    Ocr { detail: String },

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// All fatal errors for one analysis request.
#[derive(Debug, Error)]
pub enum SyllabusError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart body had no `file` part.
    #[error("No file provided")]
    MissingFile,

    /// The request body was not a readable multipart form.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The upload could not be written to temporary storage.
    #[error("Failed to store upload: {source}")]
    TempStorage {
        #[source]
        source: std::io::Error,
    },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Text extraction failed; the message is the underlying cause.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// The LLM provider is not configured (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM call itself failed.
    #[error("LLM request failed: {message}")]
    LlmInvocation { message: String },

    /// The LLM response was not JSON even after repair.
    ///
    /// Carries the parse error of the *original* response.
    #[error("Failed to parse LLM response: {source}")]
    JsonRepairFailed {
        #[source]
        source: serde_json::Error,
    },

    /// The repaired response parsed but is not a JSON object.
    #[error("LLM response is not a JSON object (got {found})")]
    InvalidAnalysis { found: &'static str },

    // ── Boundary errors ───────────────────────────────────────────────────
    /// Per-client request quota exhausted.
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    /// The HTTP listener could not be bound or failed while serving.
    #[error("Server error: {source}")]
    Server {
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyllabusError {
    /// HTTP status used when this error terminates a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyllabusError::MissingFile | SyllabusError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            SyllabusError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
