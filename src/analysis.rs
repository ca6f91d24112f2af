//! Typed model of the JSON the LLM is asked to return.
//!
//! The server never enforces this shape: it forwards the repaired JSON
//! string untouched. These types exist for callers (and the CLI summary)
//! that want typed access. Every field defaults, so a partially filled
//! response still deserialises.

use serde::{Deserialize, Serialize};

/// Structured syllabus summary, mirroring [`crate::prompts::ANALYSIS_PROMPT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyllabusAnalysis {
    pub course_info: CourseInfo,
    pub grade_distribution: GradeDistribution,
    pub policies: Policies,
    pub instructor_info: InstructorInfo,
    pub materials: Vec<serde_json::Value>,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseInfo {
    pub title: String,
    pub description: String,
    pub course_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeDistribution {
    pub weights: Vec<GradeWeight>,
    pub scale: Vec<GradeCutoff>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeWeight {
    pub category: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeCutoff {
    pub grade: String,
    pub minimum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policies {
    pub attendance: Option<String>,
    pub late_work: Option<String>,
    pub exam_format: Option<String>,
    pub homework_format: Option<String>,
    pub other: Vec<OtherPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherPolicy {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructorInfo {
    pub instructors: Vec<Person>,
    pub tas: Vec<Person>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub name: String,
    pub email: Option<String>,
    pub office: Option<String>,
    pub office_hours: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEntry {
    pub week: Option<u32>,
    pub date: Option<String>,
    pub topic: String,
    pub assignments: Option<String>,
}

impl SyllabusAnalysis {
    /// Parse an `analyzed` JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sum of all grade weights, in percent.
    pub fn total_weight(&self) -> f64 {
        self.grade_distribution
            .weights
            .iter()
            .map(|w| w.percentage)
            .sum()
    }
}
