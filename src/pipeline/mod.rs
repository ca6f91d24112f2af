//! Pipeline stages for syllabus analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the two external engines (pdfium, Tesseract) can be replaced by
//! fakes.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ extract ──▶ normalize ──▶ llm ──▶ repair
//! (temp file) (pdf/docx/ocr) (ASCII)   (chat)  (JSON)
//! ```
//!
//! 1. [`upload`]:    hold the uploaded bytes and stage them to a temp file
//! 2. [`extract`]:   choose a strategy by extension; runs in `spawn_blocking`
//!    because pdfium and Tesseract block. Backed by [`pdf`], [`docx`] and [`ocr`]
//! 3. [`normalize`]: squash the text into one ASCII line safe to embed in a prompt
//! 4. [`llm`]:       one chat completion; the only stage with network I/O
//! 5. [`repair`]:    recover JSON from fenced or single-quoted replies

pub mod docx;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod repair;
pub mod upload;
