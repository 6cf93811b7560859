// src/web/handlers/resume_handlers.rs
//! Current resume, resume list and save/autosave endpoints

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

use crate::autosave::{AutosaveCoordinator, SaveOutcome};
use crate::storage::ResumeStore;
use crate::types::resume::Resume;
use crate::web::types::{
    ActionResponse, DataResponse, DeleteResumeRequest, SaveResumeRequest, SaveResultData,
    SaveStatusData, StandardErrorResponse, StandardRequest, WithConversationId,
};

pub async fn current_resume_handler(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Option<Resume>>>, Json<StandardErrorResponse>> {
    match store.current_resume().await {
        Ok(resume) => Ok(Json(DataResponse::success(
            "Current resume loaded".to_string(),
            resume,
            None,
        ))),
        Err(e) => {
            error!("Failed to load current resume: {:#}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to load current resume".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn manual_save_handler(
    request: Json<StandardRequest<SaveResumeRequest>>,
    coordinator: &State<AutosaveCoordinator>,
) -> Result<Json<DataResponse<SaveResultData>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match coordinator.manual_save(&request.data.resume).await {
        Ok(SaveOutcome::Saved(version)) => {
            info!("Manual save completed for resume {}", version.resume_id);
            Ok(Json(DataResponse::success(
                "Resume saved".to_string(),
                SaveResultData {
                    saved: true,
                    version: Some(version),
                },
                conversation_id,
            )))
        }
        Ok(SaveOutcome::Unchanged) | Ok(SaveOutcome::Superseded) => Ok(Json(DataResponse::success(
            "No changes to save".to_string(),
            SaveResultData {
                saved: false,
                version: None,
            },
            conversation_id,
        ))),
        Ok(SaveOutcome::Failed(reason)) => Err(Json(StandardErrorResponse::new(
            format!("Save failed: {}", reason),
            "SAVE_FAILED".to_string(),
            vec!["Retry the save".to_string()],
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Save failed: {}", e),
            "SAVE_FAILED".to_string(),
            vec!["Retry the save".to_string()],
            conversation_id,
        ))),
    }
}

pub async fn autosave_handler(
    request: Json<StandardRequest<SaveResumeRequest>>,
    coordinator: &State<AutosaveCoordinator>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match coordinator.schedule_auto_save(&request.data.resume).await {
        Ok(true) => Ok(Json(ActionResponse::success(
            "Autosave scheduled".to_string(),
            "autosave-scheduled".to_string(),
            conversation_id,
        ))),
        Ok(false) => Ok(Json(ActionResponse::success(
            "Content unchanged, autosave skipped".to_string(),
            "autosave-skipped".to_string(),
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to schedule autosave: {}", e),
            "AUTOSAVE_FAILED".to_string(),
            vec!["Retry the edit".to_string()],
            conversation_id,
        ))),
    }
}

pub async fn save_status_handler(
    coordinator: &State<AutosaveCoordinator>,
) -> Json<DataResponse<SaveStatusData>> {
    Json(DataResponse::success(
        "Save status".to_string(),
        SaveStatusData {
            status: coordinator.status(),
        },
        None,
    ))
}

pub async fn list_resumes_handler(
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Vec<Resume>>>, Json<StandardErrorResponse>> {
    match store.list_resumes().await {
        Ok(resumes) => Ok(Json(DataResponse::success(
            format!("{} resume(s)", resumes.len()),
            resumes,
            None,
        ))),
        Err(e) => {
            error!("Failed to list resumes: {:#}", e);
            Err(Json(StandardErrorResponse::new(
                "Failed to list resumes".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn delete_resume_handler(
    request: Json<StandardRequest<DeleteResumeRequest>>,
    store: &State<ResumeStore>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match store.delete_resume(&request.data.resume_id).await {
        Ok(true) => Ok(Json(ActionResponse::success(
            "Resume deleted".to_string(),
            "resume-deleted".to_string(),
            conversation_id,
        ))),
        Ok(false) => Ok(Json(ActionResponse::success(
            "Resume not found, nothing deleted".to_string(),
            "resume-missing".to_string(),
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to delete resume: {}", e),
            "STORE_WRITE_ERROR".to_string(),
            vec!["Try again in a few moments".to_string()],
            conversation_id,
        ))),
    }
}
