// src/web/handlers/ai_handlers.rs
//! AI Gateway proxies. Each handler builds a client from the configured
//! service URL and the stored credential; gateway failures become error
//! envelopes, never crashes.

use rocket::serde::json::Json;
use rocket::State;
use tracing::error;

use crate::config::ServiceConfig;
use crate::gateway::GatewayClient;
use crate::storage::ResumeStore;
use crate::types::gateway::JobMatchReport;
use crate::types::resume::{AiSuggestion, Resume, ResumeSections};
use crate::web::types::{
    AnalyzeResumeRequest, DataResponse, GenerateResumeRequest, OptimizeResumeRequest,
    StandardErrorResponse, StandardRequest, TranslateResumeRequest, WithConversationId,
};

/// Builds a gateway client for one request, or the error envelope explaining
/// why it could not be built.
async fn gateway_for_request(
    store: &ResumeStore,
    service: &ServiceConfig,
    conversation_id: Option<String>,
) -> Result<GatewayClient, Json<StandardErrorResponse>> {
    let api_key = match store.api_key().await {
        Ok(Some(key)) => key,
        Ok(None) => {
            return Err(Json(StandardErrorResponse::new(
                "AI service credential not configured".to_string(),
                "API_KEY_MISSING".to_string(),
                vec!["Add your AI service API key in settings".to_string()],
                conversation_id,
            )))
        }
        Err(e) => {
            error!("Failed to read API key: {:#}", e);
            return Err(Json(StandardErrorResponse::new(
                "Failed to read AI service credential".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )));
        }
    };

    GatewayClient::new(
        service.ai_service_url.clone(),
        api_key,
        Some(service.timeout_seconds),
    )
    .map_err(|e| {
        error!("Failed to build gateway client: {:#}", e);
        Json(StandardErrorResponse::new(
            "AI service initialization failed".to_string(),
            "SERVICE_INIT_FAILED".to_string(),
            vec!["Contact system administrator".to_string()],
            conversation_id,
        ))
    })
}

fn gateway_error(
    context: &str,
    e: anyhow::Error,
    conversation_id: Option<String>,
) -> Json<StandardErrorResponse> {
    error!("{}: {:#}", context, e);
    Json(StandardErrorResponse::new(
        format!("{}: {}", context, e),
        "AI_SERVICE_ERROR".to_string(),
        vec![
            "Check your API key".to_string(),
            "Retry the request".to_string(),
        ],
        conversation_id,
    ))
}

pub async fn analyze_resume_handler(
    request: Json<StandardRequest<AnalyzeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<ServiceConfig>,
) -> Result<Json<DataResponse<Vec<AiSuggestion>>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let gateway = gateway_for_request(store, service, conversation_id.clone()).await?;

    match gateway.analyze(&request.data.resume).await {
        Ok(suggestions) => Ok(Json(DataResponse::success(
            format!("{} suggestion(s)", suggestions.len()),
            suggestions,
            conversation_id,
        ))),
        Err(e) => Err(gateway_error("Resume analysis failed", e, conversation_id)),
    }
}

pub async fn ats_score_handler(
    request: Json<StandardRequest<AnalyzeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<ServiceConfig>,
) -> Result<Json<DataResponse<u8>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let gateway = gateway_for_request(store, service, conversation_id.clone()).await?;

    match gateway.score(&request.data.resume).await {
        Ok(score) => Ok(Json(DataResponse::success(
            "ATS compatibility score".to_string(),
            score,
            conversation_id,
        ))),
        Err(e) => Err(gateway_error("ATS scoring failed", e, conversation_id)),
    }
}

pub async fn optimize_resume_handler(
    request: Json<StandardRequest<OptimizeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<ServiceConfig>,
) -> Result<Json<DataResponse<JobMatchReport>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let gateway = gateway_for_request(store, service, conversation_id.clone()).await?;

    match gateway
        .optimize(&request.data.resume, &request.data.job_text)
        .await
    {
        Ok(report) => Ok(Json(DataResponse::success(
            "Job match analysis completed".to_string(),
            report,
            conversation_id,
        ))),
        Err(e) => Err(gateway_error(
            "Resume optimization failed",
            e,
            conversation_id,
        )),
    }
}

pub async fn translate_resume_handler(
    request: Json<StandardRequest<TranslateResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<ServiceConfig>,
) -> Result<Json<DataResponse<Resume>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let gateway = gateway_for_request(store, service, conversation_id.clone()).await?;

    match gateway
        .translate(&request.data.resume, &request.data.language)
        .await
    {
        Ok(translated) => Ok(Json(DataResponse::success(
            format!("Resume translated to {}", request.data.language),
            translated,
            conversation_id,
        ))),
        Err(e) => Err(gateway_error(
            "Resume translation failed",
            e,
            conversation_id,
        )),
    }
}

pub async fn generate_resume_handler(
    request: Json<StandardRequest<GenerateResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<ServiceConfig>,
) -> Result<Json<DataResponse<ResumeSections>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let gateway = gateway_for_request(store, service, conversation_id.clone()).await?;

    match gateway.generate_sections(&request.data.user_info).await {
        Ok(sections) => Ok(Json(DataResponse::success(
            "Resume draft generated".to_string(),
            sections,
            conversation_id,
        ))),
        Err(e) => Err(gateway_error(
            "Resume generation failed",
            e,
            conversation_id,
        )),
    }
}
