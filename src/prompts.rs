//! Prompts for syllabus analysis.
//!
//! Every prompt lives here so the instruction text can be changed without
//! touching the request or repair logic, and so tests can inspect it
//! directly. Callers can override the system instruction via
//! [`crate::config::AnalysisConfig::system_prompt`]; the schema prompt is
//! fixed because [`crate::analysis::SyllabusAnalysis`] mirrors it.

/// Default system instruction.
pub const SYSTEM_PROMPT: &str = "You are a syllabus analyzer that extracts structured information \
from course syllabi. Return only valid JSON without any markdown formatting or additional text.";

/// Instruction and target JSON shape sent ahead of the syllabus text.
pub const ANALYSIS_PROMPT: &str = r#"Analyze this syllabus text and extract the following information in a structured format.
Return ONLY valid JSON without any markdown formatting or explanation.
The JSON should follow this structure:
{
    "courseInfo": {
        "title": "",
        "description": "",
        "courseCode": ""
    },
    "gradeDistribution": {
        "weights": [{"category": "", "percentage": 0}],
        "scale": [{"grade": "", "minimum": 0}]
    },
    "policies": {
        "attendance": "",
        "lateWork": "",
        "examFormat": "",
        "homeworkFormat": "",
        "other": [{"title": "", "content": ""}]
    },
    "instructorInfo": {
        "instructors": [{"name": "", "email": "", "office": "", "officeHours": ""}],
        "tas": [{"name": "", "email": "", "officeHours": ""}]
    },
    "materials": [],
    "schedule": {
        "entries": [{"week": null, "date": "", "topic": "", "assignments": ""}]
    }
}"#;

/// Build the user message: the schema prompt followed by the normalised text.
pub fn user_message(normalized_text: &str) -> String {
    format!("{ANALYSIS_PROMPT}\n\nSyllabus text:\n{normalized_text}")
}
