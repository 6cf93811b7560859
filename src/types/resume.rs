// src/types/resume.rs
//! Resume data model shared by the store, the version engine and the web API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBasicInfo {
    pub full_name: String,
    pub job_title: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub target_role: Option<String>,
    pub experience: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub portfolio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub gpa: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub url: Option<String>,
    pub github: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSection {
    pub id: String,
    pub title: String,
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSections {
    pub summary: String,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub projects: Vec<Project>,
    pub skills: Vec<String>,
    pub custom_sections: Vec<CustomSection>,
}

/// Visual layout selector. Rendering itself happens client-side; the backend
/// only persists the choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    #[default]
    Modern,
    Classic,
    Minimal,
    Creative,
    Professional,
    Compact,
}

/// Severity and category of an AI suggestion, kept as open strings on the
/// wire (`ats|content|grammar|style|keyword`, `low|medium|high`) since the
/// remote service owns the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub section: String,
    pub field: Option<String>,
    pub message: String,
    pub suggestion: String,
    pub severity: String,
    #[serde(default)]
    pub applied: bool,
}

/// Aggregate root. `id` is immutable once created and is the join key for
/// all version records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    pub user_info: UserBasicInfo,
    pub sections: ResumeSections,
    pub template: TemplateKind,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ats_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<AiSuggestion>>,
}

impl Resume {
    /// Fresh resume for a user profile, with empty sections.
    pub fn new(user_info: UserBasicInfo, language: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_info,
            sections: ResumeSections::default(),
            template: TemplateKind::default(),
            language: language.to_string(),
            created_at: now,
            last_modified: now,
            ats_score: None,
            suggestions: None,
        }
    }
}

/// Immutable point-in-time snapshot of a resume. `data` is a full structural
/// copy taken at save time and is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeVersion {
    pub id: String,
    pub resume_id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub data: Resume,
    pub is_auto_save: bool,
}
