// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, options, post, routes, Request, Response, State};
use std::path::PathBuf;
use tracing::{error, info};

use crate::autosave::AutosaveCoordinator;
use crate::config::ConfigManager;
use crate::storage::{ResumeStore, StoreConfig};
use crate::types::resume::{Resume, ResumeVersion, UserBasicInfo};
use crate::versioning::VersionHistory;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// ===== Resume & save endpoints =====

#[get("/resume")]
pub async fn current_resume(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Option<Resume>>>, Json<StandardErrorResponse>> {
    handlers::current_resume_handler(store).await
}

#[post("/resume", data = "<request>")]
pub async fn manual_save(
    request: Json<StandardRequest<SaveResumeRequest>>,
    coordinator: &State<AutosaveCoordinator>,
) -> Result<Json<DataResponse<SaveResultData>>, Json<StandardErrorResponse>> {
    handlers::manual_save_handler(request, coordinator).await
}

#[post("/autosave", data = "<request>")]
pub async fn autosave(
    request: Json<StandardRequest<SaveResumeRequest>>,
    coordinator: &State<AutosaveCoordinator>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::autosave_handler(request, coordinator).await
}

#[get("/save-status")]
pub async fn save_status(
    coordinator: &State<AutosaveCoordinator>,
) -> Json<DataResponse<SaveStatusData>> {
    handlers::save_status_handler(coordinator).await
}

#[get("/resumes")]
pub async fn list_resumes(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Vec<Resume>>>, Json<StandardErrorResponse>> {
    handlers::list_resumes_handler(store).await
}

#[post("/delete-resume", data = "<request>")]
pub async fn delete_resume(
    request: Json<StandardRequest<DeleteResumeRequest>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::delete_resume_handler(request, store).await
}

// ===== Version history endpoints =====

#[get("/versions/<resume_id>")]
pub async fn list_versions(
    resume_id: &str,
    history: &State<VersionHistory>,
) -> Result<Json<DataResponse<Vec<ResumeVersion>>>, Json<StandardErrorResponse>> {
    handlers::list_versions_handler(resume_id, history).await
}

#[post("/save-version", data = "<request>")]
pub async fn save_version(
    request: Json<StandardRequest<SaveVersionRequest>>,
    history: &State<VersionHistory>,
) -> Result<Json<DataResponse<ResumeVersion>>, Json<StandardErrorResponse>> {
    handlers::save_named_version_handler(request, history).await
}

#[post("/restore-version", data = "<request>")]
pub async fn restore_version(
    request: Json<StandardRequest<RestoreVersionRequest>>,
    history: &State<VersionHistory>,
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Resume>>, Json<StandardErrorResponse>> {
    handlers::restore_version_handler(request, history, store).await
}

#[post("/delete-version", data = "<request>")]
pub async fn delete_version(
    request: Json<StandardRequest<DeleteVersionRequest>>,
    history: &State<VersionHistory>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::delete_version_handler(request, history).await
}

// ===== Settings endpoints =====

#[get("/user-info")]
pub async fn user_info(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Option<UserBasicInfo>>>, Json<StandardErrorResponse>> {
    handlers::user_info_handler(store).await
}

#[post("/user-info", data = "<request>")]
pub async fn set_user_info(
    request: Json<StandardRequest<UserBasicInfo>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::set_user_info_handler(request, store).await
}

#[get("/api-key-status")]
pub async fn api_key_status(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<ApiKeyStatusData>>, Json<StandardErrorResponse>> {
    handlers::api_key_status_handler(store).await
}

#[post("/api-key", data = "<request>")]
pub async fn set_api_key(
    request: Json<StandardRequest<ApiKeyRequest>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    handlers::set_api_key_handler(request, store).await
}

// ===== AI gateway endpoints =====

#[post("/analyze-resume", data = "<request>")]
pub async fn analyze_resume(
    request: Json<StandardRequest<AnalyzeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<crate::config::ServiceConfig>,
) -> Result<Json<DataResponse<Vec<crate::types::resume::AiSuggestion>>>, Json<StandardErrorResponse>>
{
    handlers::analyze_resume_handler(request, store, service).await
}

#[post("/ats-score", data = "<request>")]
pub async fn ats_score(
    request: Json<StandardRequest<AnalyzeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<crate::config::ServiceConfig>,
) -> Result<Json<DataResponse<u8>>, Json<StandardErrorResponse>> {
    handlers::ats_score_handler(request, store, service).await
}

#[post("/optimize-resume", data = "<request>")]
pub async fn optimize_resume(
    request: Json<StandardRequest<OptimizeResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<crate::config::ServiceConfig>,
) -> Result<Json<DataResponse<crate::types::gateway::JobMatchReport>>, Json<StandardErrorResponse>>
{
    handlers::optimize_resume_handler(request, store, service).await
}

#[post("/translate-resume", data = "<request>")]
pub async fn translate_resume(
    request: Json<StandardRequest<TranslateResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<crate::config::ServiceConfig>,
) -> Result<Json<DataResponse<Resume>>, Json<StandardErrorResponse>> {
    handlers::translate_resume_handler(request, store, service).await
}

#[post("/generate-resume", data = "<request>")]
pub async fn generate_resume(
    request: Json<StandardRequest<GenerateResumeRequest>>,
    store: &State<ResumeStore>,
    service: &State<crate::config::ServiceConfig>,
) -> Result<Json<DataResponse<crate::types::resume::ResumeSections>>, Json<StandardErrorResponse>>
{
    handlers::generate_resume_handler(request, store, service).await
}

// Preflight handler for CORS
#[options("/<_..>")]
pub fn all_options() -> Status {
    Status::Ok
}

// ===== Catchers =====

#[catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Malformed request body".to_string(),
        "BAD_REQUEST".to_string(),
        vec!["Check the request JSON against the API contract".to_string()],
        None,
    ))
}

#[catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Unknown endpoint".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
        None,
    ))
}

#[catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec!["Try again in a few moments".to_string()],
        None,
    ))
}

/// Initialize storage and mount the API.
pub async fn start_web_server(database_path: PathBuf, config: ConfigManager) -> Result<()> {
    let mut store_config = StoreConfig::new(database_path);

    if let Err(e) = store_config.init_pool().await {
        error!("Failed to initialize database: {}", e);
        return Err(e);
    }

    if let Err(e) = store_config.migrate().await {
        error!("Failed to run database migrations: {}", e);
        return Err(e);
    }

    let store = ResumeStore::new(store_config.pool()?.clone());
    let history = VersionHistory::new(store.clone());
    let coordinator =
        AutosaveCoordinator::new(store.clone(), history.clone(), config.autosave.clone());

    info!("Starting Resume Builder API server");
    info!("Database: {}", store_config.database_path.display());
    info!("AI service: {}", config.service.ai_service_url);

    let _rocket = rocket::build()
        .attach(Cors)
        .manage(store)
        .manage(history)
        .manage(coordinator)
        .manage(config.service.clone())
        .register("/api", catchers![bad_request, not_found, internal_error])
        .mount(
            "/api",
            routes![
                current_resume,
                manual_save,
                autosave,
                save_status,
                list_resumes,
                delete_resume,
                list_versions,
                save_version,
                restore_version,
                delete_version,
                user_info,
                set_user_info,
                api_key_status,
                set_api_key,
                analyze_resume,
                ats_score,
                optimize_resume,
                translate_resume,
                generate_resume,
                all_options,
            ],
        )
        .launch()
        .await?;

    Ok(())
}
