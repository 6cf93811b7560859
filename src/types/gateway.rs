// src/types/gateway.rs
//! Wire contracts for the remote AI service

use serde::{Deserialize, Serialize};

use super::resume::{AiSuggestion, Resume, ResumeSections};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub status: String,
    pub suggestions: Vec<AiSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub status: String,
    pub score: i64,
}

/// Per-section rewrite proposals for a target job posting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedImprovements {
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatchReport {
    pub match_score: i64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub suggested_improvements: SuggestedImprovements,
    #[serde(default)]
    pub keyword_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub status: String,
    #[serde(flatten)]
    pub report: JobMatchReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub status: String,
    pub resume: Resume,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub status: String,
    pub sections: ResumeSections,
}
