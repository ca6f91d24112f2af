//! Text normalisation applied before the text is embedded in the LLM prompt.
//!
//! Extracted text carries OCR noise, ligatures, smart quotes and ragged
//! whitespace. None of it helps the model, and stray `"` or `` ` ``
//! characters inside the prompt make it more likely that the model echoes
//! them unescaped into its JSON. The rules run in a fixed order: non-ASCII
//! runs become spaces *before* whitespace is collapsed, so a removed glyph
//! never leaves a double space behind.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NON_ASCII: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]+").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise extracted text for LLM submission.
///
/// 1. Every run of non-ASCII characters becomes one space
/// 2. Every run of whitespace becomes one space
/// 3. Backticks become apostrophes
/// 4. Double quotes become apostrophes
/// 5. Leading and trailing whitespace is trimmed
///
/// Total and idempotent.
pub fn normalize(text: &str) -> String {
    let s = RE_NON_ASCII.replace_all(text, " ");
    let s = RE_WHITESPACE.replace_all(&s, " ");
    s.replace(['`', '"'], "'").trim().to_string()
}
