//! Repair of LLM responses that should be JSON but are not quite.
//!
//! Even with "return ONLY valid JSON" in the prompt, chat models regularly:
//!
//! - wrap the object in ```` ```json ... ``` ```` fences
//! - use Python-style `'single quoted'` strings
//!
//! [`repair`] makes two attempts and returns the first one that parses:
//!
//! 1. the raw response, unchanged
//! 2. the response with every fence marker removed and single-quoted string
//!    literals rewritten as double-quoted ones
//!
//! Step 2 lexes the text instead of substituting `'` → `"` globally, so an
//! apostrophe inside a legitimate double-quoted string (`"Bob's office"`)
//! survives. Inside a single-quoted literal, a `'` only terminates the
//! literal when the next non-space character is a JSON delimiter
//! (`, : } ]`) or the end of input; otherwise it is kept as an apostrophe.

use crate::error::SyllabusError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error};

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*").unwrap());
static RE_BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*").unwrap());

/// Return `raw` if it is valid JSON, else a repaired copy that is.
///
/// # Errors
/// [`SyllabusError::JsonRepairFailed`] carrying the parse error of the
/// original input when neither attempt parses.
pub fn repair(raw: &str) -> Result<String, SyllabusError> {
    let original_err = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(_) => return Ok(raw.to_string()),
        Err(e) => e,
    };
    debug!("Initial JSON parse failed: {}", original_err);

    let cleaned = strip_fences(raw);
    let cleaned = requote(&cleaned);
    let cleaned = cleaned.trim();

    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(_) => {
            debug!("JSON repaired ({} → {} bytes)", raw.len(), cleaned.len());
            Ok(cleaned.to_string())
        }
        Err(e) => {
            error!("Failed to repair JSON response: {}", e);
            Err(SyllabusError::JsonRepairFailed {
                source: original_err,
            })
        }
    }
}

fn strip_fences(input: &str) -> String {
    let s = RE_JSON_FENCE.replace_all(input, "");
    RE_BARE_FENCE.replace_all(&s, "").into_owned()
}

#[derive(Clone, Copy, PartialEq)]
enum Lex {
    Outside,
    Double,
    Single,
}

/// Rewrite single-quoted string literals as double-quoted JSON strings.
fn requote(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut state = Lex::Outside;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            Lex::Outside => match c {
                '"' => {
                    state = Lex::Double;
                    out.push(c);
                }
                '\'' => {
                    state = Lex::Single;
                    out.push('"');
                }
                _ => out.push(c),
            },
            Lex::Double => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if c == '"' {
                    state = Lex::Outside;
                }
            }
            Lex::Single => match c {
                '\\' => match chars.get(i + 1) {
                    Some('\'') => {
                        out.push('\'');
                        i += 1;
                    }
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    None => out.push('\\'),
                },
                '"' => out.push_str("\\\""),
                '\'' if closes_literal(&chars[i + 1..]) => {
                    state = Lex::Outside;
                    out.push('"');
                }
                _ => out.push(c),
            },
        }
        i += 1;
    }

    out
}

fn closes_literal(rest: &[char]) -> bool {
    match rest.iter().find(|c| !c.is_whitespace()) {
        None => true,
        Some(c) => matches!(c, ',' | ':' | '}' | ']'),
    }
}
