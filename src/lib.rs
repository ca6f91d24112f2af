//! # syllabus-analyzer
//!
//! Extract the text of an uploaded syllabus (PDF, DOCX, image or plain
//! text) and have an LLM turn it into structured JSON: course info,
//! grading, policies, instructors, materials and schedule.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Stage      write bytes to a temp file (removed on every path)
//!  ├─ 2. Extract    PDF text layer → OCR fallback, DOCX walk, image OCR, UTF-8
//!  ├─ 3. Normalize  ASCII only, single spaces, no double quotes
//!  ├─ 4. Analyze    one chat completion (gpt-4o-mini by default)
//!  ├─ 5. Repair     strip fences, fix single-quoted JSON
//!  └─ 6. Validate   must be a JSON object
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syllabus_analyzer::{AnalysisConfig, AnalysisService, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = AnalysisConfig::default();
//!     let service = AnalysisService::from_config(&config)?;
//!
//!     let bytes = std::fs::read("syllabus.pdf")?;
//!     let output = service
//!         .analyze_upload(UploadedDocument::new("syllabus.pdf", bytes))
//!         .await?;
//!     println!("{}", output.analyzed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `syllabus-analyzer` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## External Programs
//!
//! PDF support needs the pdfium shared library (`PDFIUM_LIB_PATH`, the
//! working directory, or the system library path). OCR needs the
//! `tesseract` executable with the configured language data installed.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::SyllabusAnalysis;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use error::{ExtractionError, SyllabusError};
pub use output::AnalysisOutput;
pub use pipeline::extract::{DocumentKind, Extractor};
pub use pipeline::llm::{LlmAnalyzer, SyllabusAnalyzer};
pub use pipeline::ocr::{OcrEngine, TesseractCli};
pub use pipeline::pdf::{PageVisitor, PdfBackend, PdfiumBackend};
pub use pipeline::upload::UploadedDocument;
pub use server::{router, AppState};
pub use service::{extract_upload, AnalysisService};
