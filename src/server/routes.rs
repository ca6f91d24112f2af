//! HTTP handlers.
//!
//! - `POST /extract-text` - multipart upload (field `file`) → analysis
//! - `GET /health` - liveness probe

use super::AppState;
use crate::error::SyllabusError;
use crate::output::AnalysisOutput;
use crate::pipeline::upload::UploadedDocument;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
}

/// A failed request: the error plus the upload name when one was received.
#[derive(Debug)]
pub struct ApiError {
    error: SyllabusError,
    filename: Option<String>,
}

impl ApiError {
    fn new(error: SyllabusError, filename: Option<String>) -> Self {
        Self { error, filename }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            error!(filename = ?self.filename, "Request failed: {}", self.error);
        } else {
            warn!(filename = ?self.filename, "Request rejected: {}", self.error);
        }

        let body = Json(ErrorResponse {
            error: self.error.to_string(),
            filename: self.filename,
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /extract-text
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisOutput>, ApiError> {
    let mut multipart = multipart
        .map_err(|e| ApiError::new(SyllabusError::InvalidUpload(e.to_string()), None))?;

    let doc = read_upload(&mut multipart)
        .await
        .map_err(|e| ApiError::new(e, None))?;
    let filename = doc.filename.clone();

    state
        .service
        .analyze_upload(doc)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, Some(filename)))
}

/// Take the first `file` part that carries a filename. Other parts are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadedDocument, SyllabusError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SyllabusError::InvalidUpload(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let filename = match field.file_name() {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => return Err(SyllabusError::MissingFile),
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| SyllabusError::InvalidUpload(e.to_string()))?;
        debug!("Received '{}' ({} bytes)", filename, data.len());

        return Ok(UploadedDocument::new(filename, data.to_vec()));
    }

    Err(SyllabusError::MissingFile)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
