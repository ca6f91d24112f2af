//! PDF access: embedded text layer and page rasterisation via pdfium.
//!
//! ## Why a trait?
//!
//! The extraction policy (text layer first, OCR only when it is empty) is
//! the part worth testing, and it should not need a pdfium shared library
//! to do so. [`PdfBackend`] exposes exactly the two operations the policy
//! needs; [`PdfiumBackend`] is the production implementation.
//!
//! ## Rendering
//!
//! Pages are rendered one at a time and handed to a visitor, so at most one
//! bitmap is alive however many pages the document has. `max_pixels` caps
//! the longest edge of a rendered page regardless of its physical size.

use crate::error::ExtractionError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The two PDF operations the extraction policy needs. Blocking.
pub trait PdfBackend: Send + Sync {
    /// Text layer of every page, in page order.
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;

    /// Render each page in order and pass it to `visit` with its index.
    ///
    /// A page is dropped before the next one is rendered. The first error,
    /// from rendering or from `visit`, stops the walk.
    fn render_pages(
        &self,
        path: &Path,
        visit: &mut PageVisitor<'_>,
    ) -> Result<(), ExtractionError>;
}

/// Callback receiving one rendered page at a time.
pub type PageVisitor<'a> = dyn FnMut(usize, DynamicImage) -> Result<(), ExtractionError> + 'a;

/// [`PdfBackend`] backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
    max_pixels: u32,
}

impl PdfiumBackend {
    /// `lib_path` is the directory holding the pdfium shared library; when
    /// None the working directory and then the system library path are tried.
    pub fn new(lib_path: Option<PathBuf>, max_pixels: u32) -> Self {
        Self {
            lib_path,
            max_pixels,
        }
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.lib_path {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ExtractionError::Pdf {
            detail: format!(
                "Failed to bind to pdfium library: {e:?}. Set PDFIUM_LIB_PATH to the directory containing it."
            ),
        })?;

        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumBackend {
    fn default() -> Self {
        Self::new(None, 2000)
    }
}

fn open<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractionError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ExtractionError::Pdf {
            detail: format!("'{}' could not be opened: {e:?}", path.display()),
        })
}

impl PdfBackend for PdfiumBackend {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, path)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ExtractionError::Pdf {
                    detail: format!("text layer of page {} unreadable: {e:?}", idx + 1),
                })?
                .all();
            debug!("Page {}: {} characters in text layer", idx + 1, text.len());
            texts.push(text);
        }
        Ok(texts)
    }

    fn render_pages(
        &self,
        path: &Path,
        visit: &mut PageVisitor<'_>,
    ) -> Result<(), ExtractionError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, path)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        for (idx, page) in document.pages().iter().enumerate() {
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| ExtractionError::Pdf {
                        detail: format!("rasterisation of page {} failed: {e:?}", idx + 1),
                    })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            drop(bitmap);
            visit(idx, image)?;
        }
        Ok(())
    }
}
