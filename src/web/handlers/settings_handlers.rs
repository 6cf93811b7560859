// src/web/handlers/settings_handlers.rs
//! Onboarding profile and AI credential endpoints

use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use crate::storage::ResumeStore;
use crate::types::resume::UserBasicInfo;
use crate::web::types::{
    ActionResponse, ApiKeyRequest, ApiKeyStatusData, DataResponse, StandardErrorResponse,
    StandardRequest, WithConversationId,
};

pub async fn user_info_handler(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Option<UserBasicInfo>>>, Json<StandardErrorResponse>> {
    match store.user_info().await {
        Ok(info) => Ok(Json(DataResponse::success(
            "User info loaded".to_string(),
            info,
            None,
        ))),
        Err(e) => {
            error!("Failed to load user info: {:#}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to load user info".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn set_user_info_handler(
    request: Json<StandardRequest<UserBasicInfo>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match store.set_user_info(&request.data).await {
        Ok(()) => Ok(Json(ActionResponse::success(
            "User info saved".to_string(),
            "user-info-saved".to_string(),
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to save user info: {}", e),
            "STORE_WRITE_ERROR".to_string(),
            vec!["Retry the save".to_string()],
            conversation_id,
        ))),
    }
}

/// Reports only whether a credential exists; the key itself never leaves the
/// store through this endpoint.
pub async fn api_key_status_handler(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<ApiKeyStatusData>>, Json<StandardErrorResponse>> {
    match store.api_key().await {
        Ok(key) => Ok(Json(DataResponse::success(
            "API key status".to_string(),
            ApiKeyStatusData {
                configured: key.is_some(),
            },
            None,
        ))),
        Err(e) => {
            error!("Failed to read API key: {:#}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to read API key status".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn set_api_key_handler(
    request: Json<StandardRequest<ApiKeyRequest>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    if request.data.api_key.trim().is_empty() {
        return Err(Json(StandardErrorResponse::new(
            "API key must not be empty".to_string(),
            "INVALID_API_KEY".to_string(),
            vec!["Paste the key from your AI service console".to_string()],
            conversation_id,
        )));
    }

    match store.set_api_key(request.data.api_key.trim()).await {
        Ok(()) => Ok(Json(ActionResponse::success(
            "API key saved".to_string(),
            "api-key-saved".to_string(),
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to save API key: {}", e),
            "STORE_WRITE_ERROR".to_string(),
            vec!["Retry the save".to_string()],
            conversation_id,
        ))),
    }
}
