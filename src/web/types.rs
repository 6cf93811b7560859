// src/web/types.rs
//! Standard request/response envelope shared by every endpoint

use rocket::serde::{Deserialize, Serialize};

use crate::autosave::SaveStatus;
use crate::types::resume::{Resume, ResumeVersion, UserBasicInfo};

// ===== Requests =====

/// Every request body may carry an optional conversation id that is echoed
/// back in the response envelope.
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SaveResumeRequest {
    pub resume: Resume,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SaveVersionRequest {
    pub resume: Resume,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct RestoreVersionRequest {
    pub version_id: String,
    pub resume_id: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct DeleteVersionRequest {
    pub version_id: String,
    pub resume_id: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct DeleteResumeRequest {
    pub resume_id: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiKeyRequest {
    pub api_key: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalyzeResumeRequest {
    pub resume: Resume,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct OptimizeResumeRequest {
    pub resume: Resume,
    pub job_text: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct TranslateResumeRequest {
    pub resume: Resume,
    pub language: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct GenerateResumeRequest {
    pub user_info: UserBasicInfo,
}

// ===== Responses =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Action,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            conversation_id,
        }
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

// ===== Response payloads =====

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SaveStatusData {
    pub status: SaveStatus,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct SaveResultData {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ResumeVersion>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ApiKeyStatusData {
    pub configured: bool,
}
