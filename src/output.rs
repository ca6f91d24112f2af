//! Result type returned by a successful analysis.

use crate::analysis::SyllabusAnalysis;
use serde::Serialize;

/// Success payload of one analysis; serialises to the `/extract-text` body.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    /// Text as extracted, before normalisation.
    pub text: String,

    /// Repaired LLM response. Guaranteed to parse as a JSON object.
    pub analyzed: String,

    /// Name of the uploaded file.
    pub filename: String,

    /// Number of characters (Unicode scalar values) in `text`.
    pub chars_extracted: usize,
}

impl AnalysisOutput {
    /// Parse [`analyzed`](Self::analyzed) into the typed schema.
    ///
    /// Missing fields fall back to their defaults, so this only fails when a
    /// present field has the wrong JSON type.
    pub fn parsed(&self) -> Result<SyllabusAnalysis, serde_json::Error> {
        SyllabusAnalysis::from_json(&self.analyzed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_snake_case_count() {
        let out = AnalysisOutput {
            text: "Course: CS101".into(),
            analyzed: r#"{"courseInfo":{"title":"CS101"}}"#.into(),
            filename: "notes.txt".into(),
            chars_extracted: 13,
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["chars_extracted"], 13);
        assert_eq!(v["filename"], "notes.txt");
        assert_eq!(out.parsed().unwrap().course_info.title, "CS101");
    }
}
