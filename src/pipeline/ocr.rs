//! OCR: image → text.
//!
//! [`OcrEngine`] is the seam between the extraction pipeline and whatever
//! recognises text. The production engine, [`TesseractCli`], drives the
//! `tesseract` executable rather than linking libtesseract, so the crate
//! builds without Tesseract headers and the OCR binary can be swapped or
//! upgraded independently of the service.
//!
//! All methods are blocking; callers run them inside `spawn_blocking`.

use crate::error::ExtractionError;
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Recognise text in a raster image.
pub trait OcrEngine: Send + Sync {
    /// Return the recognised text. An image with no text yields `Ok("")`.
    fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionError>;
}

/// OCR via the `tesseract` command-line program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionError> {
        // tesseract reads from a path; the temp file is removed on drop.
        let input = tempfile::Builder::new()
            .prefix("syllabus-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractionError::Ocr {
                detail: format!("Failed to create temp image: {e}"),
            })?;

        image
            .save_with_format(input.path(), image::ImageFormat::Png)
            .map_err(|e| ExtractionError::Image {
                detail: e.to_string(),
            })?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| ExtractionError::Ocr {
                detail: format!("Failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr {
                detail: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "OCR {}x{} → {} characters",
            image.width(),
            image.height(),
            text.chars().count()
        );
        Ok(text)
    }
}
