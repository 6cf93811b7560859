// src/gateway.rs
//! AI Gateway client - opaque JSON contract against the remote AI service.
//!
//! The client is constructed explicitly and passed where needed; there is no
//! process-wide singleton. Every call is fallible with no automatic retry:
//! the caller surfaces the failure to the user.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, trace};

use crate::types::gateway::{
    AnalyzeResponse, GenerateResponse, JobMatchReport, OptimizeResponse, ScoreResponse,
    TranslateResponse,
};
use crate::types::resume::{AiSuggestion, Resume, ResumeSections, UserBasicInfo};

const ANALYZE_ENDPOINT: &str = "/analyze";
const SCORE_ENDPOINT: &str = "/score";
const OPTIMIZE_ENDPOINT: &str = "/optimize";
const TRANSLATE_ENDPOINT: &str = "/translate";
const GENERATE_ENDPOINT: &str = "/generate";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GatewayClient {
    pub fn new(base_url: String, api_key: String, timeout_seconds: Option<u64>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Resume review: a list of concrete improvement suggestions.
    pub async fn analyze(&self, resume: &Resume) -> Result<Vec<AiSuggestion>> {
        let payload = serde_json::json!({ "resume": resume });
        let response: AnalyzeResponse = self.post(ANALYZE_ENDPOINT, &payload).await?;
        if response.status != "success" {
            anyhow::bail!("Resume analysis failed: {}", response.status);
        }
        Ok(response.suggestions)
    }

    /// ATS compatibility score, clamped to 0..=100.
    pub async fn score(&self, resume: &Resume) -> Result<u8> {
        let payload = serde_json::json!({ "resume": resume });
        let response: ScoreResponse = self.post(SCORE_ENDPOINT, &payload).await?;
        Ok(response.score.clamp(0, 100) as u8)
    }

    /// Match the resume against a pasted job posting.
    pub async fn optimize(&self, resume: &Resume, job_text: &str) -> Result<JobMatchReport> {
        let payload = serde_json::json!({
            "resume": resume,
            "job_text": job_text,
        });
        let response: OptimizeResponse = self.post(OPTIMIZE_ENDPOINT, &payload).await?;
        if response.status != "success" {
            anyhow::bail!("Resume optimization failed: {}", response.status);
        }
        Ok(response.report)
    }

    /// Translate the whole resume; the returned resume keeps its identifier.
    pub async fn translate(&self, resume: &Resume, language: &str) -> Result<Resume> {
        let payload = serde_json::json!({
            "resume": resume,
            "language": language,
        });
        let response: TranslateResponse = self.post(TRANSLATE_ENDPOINT, &payload).await?;
        if response.status != "success" {
            anyhow::bail!("Resume translation failed: {}", response.status);
        }

        let mut translated = response.resume;
        // The service must not be able to re-key the resume.
        translated.id = resume.id.clone();
        translated.language = language.to_string();
        Ok(translated)
    }

    /// Draft initial sections from the onboarding profile.
    pub async fn generate_sections(&self, user_info: &UserBasicInfo) -> Result<ResumeSections> {
        let payload = serde_json::json!({ "user_info": user_info });
        let response: GenerateResponse = self.post(GENERATE_ENDPOINT, &payload).await?;
        if response.status != "success" {
            anyhow::bail!("Resume generation failed: {}", response.status);
        }
        Ok(response.sections)
    }

    async fn post<P: Serialize, T: DeserializeOwned>(&self, endpoint: &str, payload: &P) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        info!("Calling AI service: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("AI service request failed: {}", url))?;

        let status = response.status();
        trace!("AI service response status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("AI service returned status {}: {}", status, error_text);
        }

        let body = response
            .text()
            .await
            .context("Failed to read AI service response body")?;

        parse_payload(&body)
    }
}

/// Parse a service response body that may arrive fenced in markdown code
/// blocks. The body is model-influenced text, so a parse failure is an
/// ordinary user-facing error, never a panic.
pub fn parse_payload<T: DeserializeOwned>(body: &str) -> Result<T> {
    let cleaned = strip_code_fences(body);
    serde_json::from_str(cleaned).context("AI service returned a response that is not valid JSON")
}

fn strip_code_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
