//! Request orchestration: one upload in, one [`AnalysisOutput`] out.
//!
//! [`AnalysisService`] owns the injected collaborators (extractor backends
//! and LLM analyzer) and is shared by the HTTP handler and the CLI. Stages
//! run strictly in order and the first failure ends the request; the staged
//! temp file is removed whatever the outcome.

use crate::config::AnalysisConfig;
use crate::error::{ExtractionError, SyllabusError};
use crate::output::AnalysisOutput;
use crate::pipeline::extract::{DocumentKind, Extractor};
use crate::pipeline::llm::{LlmAnalyzer, SyllabusAnalyzer};
use crate::pipeline::normalize::normalize;
use crate::pipeline::repair::repair;
use crate::pipeline::upload::{TempUpload, UploadedDocument};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extraction + analysis pipeline with its collaborators injected.
#[derive(Clone)]
pub struct AnalysisService {
    extractor: Extractor,
    analyzer: Arc<dyn SyllabusAnalyzer>,
    temp_dir: Option<PathBuf>,
}

impl fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisService")
            .field("extractor", &self.extractor)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl AnalysisService {
    pub fn new(
        extractor: Extractor,
        analyzer: Arc<dyn SyllabusAnalyzer>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            temp_dir,
        }
    }

    /// Production service: pdfium, tesseract and the resolved LLM provider.
    ///
    /// # Errors
    /// [`SyllabusError::ProviderNotConfigured`] when no LLM provider can be resolved.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, SyllabusError> {
        Ok(Self::new(
            Extractor::from_config(config),
            Arc::new(LlmAnalyzer::from_config(config)?),
            config.temp_dir.clone(),
        ))
    }

    /// Run the full pipeline on one upload.
    pub async fn analyze_upload(
        &self,
        doc: UploadedDocument,
    ) -> Result<AnalysisOutput, SyllabusError> {
        let start = Instant::now();
        info!("Analyzing {} ({} bytes)", doc.filename, doc.bytes.len());

        // ── Step 1: Persist temp ─────────────────────────────────────────
        let staged = TempUpload::persist(&doc, self.temp_dir.as_deref())?;

        let result = self.run(&doc, &staged).await;

        // ── Step 7: Cleanup, on every path ───────────────────────────────
        staged.cleanup();

        match &result {
            Ok(out) => info!(
                "Analyzed {} in {:?} ({} characters)",
                out.filename,
                start.elapsed(),
                out.chars_extracted
            ),
            Err(e) => debug!("Analysis of {} failed: {}", doc.filename, e),
        }
        result
    }

    /// Extract text only, without calling the LLM.
    pub async fn extract_only(&self, doc: &UploadedDocument) -> Result<String, SyllabusError> {
        extract_upload(&self.extractor, doc, self.temp_dir.as_deref()).await
    }

    async fn run(
        &self,
        doc: &UploadedDocument,
        staged: &TempUpload,
    ) -> Result<AnalysisOutput, SyllabusError> {
        // ── Step 2: Extract ──────────────────────────────────────────────
        let text = self.extract_text(doc, staged).await?;

        // ── Step 3: Normalize ────────────────────────────────────────────
        let normalized = normalize(&text);
        debug!(
            "Normalized {} → {} characters",
            text.chars().count(),
            normalized.chars().count()
        );

        // ── Step 4: Invoke LLM ───────────────────────────────────────────
        let raw = self.analyzer.analyze(&normalized).await?;

        // ── Step 5: Repair JSON ──────────────────────────────────────────
        let analyzed = repair(&raw)?;

        // ── Step 6: Validate JSON ────────────────────────────────────────
        validate(&analyzed)?;

        Ok(AnalysisOutput {
            chars_extracted: text.chars().count(),
            text,
            analyzed,
            filename: doc.filename.clone(),
        })
    }

    async fn extract_text(
        &self,
        doc: &UploadedDocument,
        staged: &TempUpload,
    ) -> Result<String, SyllabusError> {
        extract_staged(&self.extractor, doc, staged).await
    }
}

/// Stage `doc`, extract its text and remove the staged copy.
///
/// Whitespace-only text fails with [`ExtractionError::EmptyExtraction`].
pub async fn extract_upload(
    extractor: &Extractor,
    doc: &UploadedDocument,
    temp_dir: Option<&Path>,
) -> Result<String, SyllabusError> {
    let staged = TempUpload::persist(doc, temp_dir)?;
    let result = extract_staged(extractor, doc, &staged).await;
    staged.cleanup();
    result
}

async fn extract_staged(
    extractor: &Extractor,
    doc: &UploadedDocument,
    staged: &TempUpload,
) -> Result<String, SyllabusError> {
    let text = extractor.extract_file(staged.path(), &doc.extension).await?;

    if text.trim().is_empty() {
        let kind = DocumentKind::from_extension(&doc.extension).label();
        return Err(ExtractionError::EmptyExtraction { kind }.into());
    }
    Ok(text)
}

/// The analysis must be a JSON object.
fn validate(analyzed: &str) -> Result<(), SyllabusError> {
    let value: Value = serde_json::from_str(analyzed)
        .map_err(|source| SyllabusError::JsonRepairFailed { source })?;

    let found = match value {
        Value::Object(_) => return Ok(()),
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
    };
    Err(SyllabusError::InvalidAnalysis { found })
}
