//! Text extraction: pick a strategy from the declared extension and run it.
//!
//! | Kind        | Strategy                                            | Empty result |
//! |-------------|-----------------------------------------------------|--------------|
//! | `pdf`       | text layer; OCR of rendered pages if layer is blank | error        |
//! | `docx`      | body paragraphs, then table rows                    | `Ok("")`     |
//! | `png/jpg`   | grayscale, then OCR                                 | `Ok("")`     |
//! | other       | UTF-8 decode                                        | `Ok("")`     |
//!
//! Every strategy is blocking (pdfium, Tesseract, file I/O), so
//! [`Extractor::extract_file`] moves the work onto the blocking pool.

use crate::config::AnalysisConfig;
use crate::error::ExtractionError;
use crate::pipeline::docx::extract_docx;
use crate::pipeline::ocr::{OcrEngine, TesseractCli};
use crate::pipeline::pdf::{PageVisitor, PdfBackend, PdfiumBackend};
use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extraction strategy selected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
    PlainText,
}

impl DocumentKind {
    /// Map a declared extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            "png" | "jpg" | "jpeg" => DocumentKind::Image,
            _ => DocumentKind::PlainText,
        }
    }
}

impl DocumentKind {
    /// Human-readable name used in log lines and error messages.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Image => "image",
            DocumentKind::PlainText => "text file",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Format-dispatching extractor with injected PDF and OCR backends.
#[derive(Clone)]
pub struct Extractor {
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrEngine>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor").finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new(pdf: Arc<dyn PdfBackend>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    /// Production extractor: pdfium + the tesseract CLI, configured from `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            Arc::new(PdfiumBackend::new(
                config.pdfium_lib_path.clone(),
                config.render_max_pixels,
            )),
            Arc::new(TesseractCli::new(
                config.tesseract_bin.clone(),
                config.ocr_language.clone(),
            )),
        )
    }

    /// Extract text from `path` using the strategy for `extension`. Blocking.
    pub fn extract(&self, path: &Path, extension: &str) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_extension(extension);
        debug!("Extracting {} from {}", kind, path.display());

        let result = match kind {
            DocumentKind::Pdf => self.extract_pdf(path),
            DocumentKind::Docx => extract_docx(&read(path)?),
            DocumentKind::Image => self.extract_image(path),
            DocumentKind::PlainText => {
                String::from_utf8(read(path)?).map_err(|source| ExtractionError::Decode { source })
            }
        };

        match &result {
            Ok(text) => info!("Extracted {} characters from {}", text.chars().count(), kind),
            Err(e) => warn!("{} extraction failed: {}", kind, e),
        }
        result
    }

    /// [`extract`](Self::extract) on the blocking thread pool.
    pub async fn extract_file(
        &self,
        path: &Path,
        extension: &str,
    ) -> Result<String, ExtractionError> {
        let this = self.clone();
        let path: PathBuf = path.to_path_buf();
        let extension = extension.to_string();

        tokio::task::spawn_blocking(move || this.extract(&path, &extension))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?
    }

    fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        let text = join_pages(self.pdf.page_texts(path)?);
        if !text.trim().is_empty() {
            debug!("Using embedded text layer");
            return Ok(text);
        }

        info!("No text layer found, falling back to OCR");
        let mut texts = Vec::new();
        self.pdf.render_pages(path, &mut |idx, page| {
            debug!("OCR page {}", idx + 1);
            texts.push(self.ocr.recognize(&page)?);
            Ok(())
        })?;

        let text = join_pages(texts);
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyExtraction { kind: "PDF" });
        }
        Ok(text)
    }

    fn extract_image(&self, path: &Path) -> Result<String, ExtractionError> {
        let image = image::open(path).map_err(|e| ExtractionError::Image {
            detail: e.to_string(),
        })?;
        let gray = DynamicImage::ImageLuma8(image.to_luma8());
        self.ocr.recognize(&gray)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Concatenate page texts, each followed by a newline.
fn join_pages(pages: Vec<String>) -> String {
    pages.into_iter().fold(String::new(), |mut acc, page| {
        acc.push_str(&page);
        acc.push('\n');
        acc
    })
}
