// src/web/handlers/version_handlers.rs
//! Version history endpoints: list, named save, restore, delete

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

use crate::storage::ResumeStore;
use crate::types::resume::{Resume, ResumeVersion};
use crate::versioning::VersionHistory;
use crate::web::types::{
    ActionResponse, DataResponse, DeleteVersionRequest, RestoreVersionRequest,
    SaveVersionRequest, StandardErrorResponse, StandardRequest, WithConversationId,
};

pub async fn list_versions_handler(
    resume_id: &str,
    history: &State<VersionHistory>,
) -> Result<Json<DataResponse<Vec<ResumeVersion>>>, Json<StandardErrorResponse>> {
    match history.get_versions(resume_id).await {
        Ok(versions) => Ok(Json(DataResponse::success(
            format!("{} version(s)", versions.len()),
            versions,
            None,
        ))),
        Err(e) => {
            error!("Failed to list versions for {}: {:#}", resume_id, e);
            Err(Json(StandardErrorResponse::new(
                "Failed to load version history".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )))
        }
    }
}

pub async fn save_named_version_handler(
    request: Json<StandardRequest<SaveVersionRequest>>,
    history: &State<VersionHistory>,
) -> Result<Json<DataResponse<ResumeVersion>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match history
        .save_named_version(&request.data.resume, &request.data.name)
        .await
    {
        Ok(version) => Ok(Json(DataResponse::success(
            format!("Version '{}' saved", request.data.name),
            version,
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to save version: {}", e),
            "VERSION_SAVE_FAILED".to_string(),
            vec!["Retry the save".to_string()],
            conversation_id,
        ))),
    }
}

/// Looks the snapshot up, writes it back to the store as the current resume,
/// and returns it. Restore never mutates the version list itself.
pub async fn restore_version_handler(
    request: Json<StandardRequest<RestoreVersionRequest>>,
    history: &State<VersionHistory>,
    store: &State<ResumeStore>,
) -> Result<Json<DataResponse<Resume>>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();
    let RestoreVersionRequest {
        version_id,
        resume_id,
    } = &request.data;

    let snapshot = match history.restore_version(version_id, resume_id).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            return Err(Json(StandardErrorResponse::new(
                format!("Version {} not found for resume {}", version_id, resume_id),
                "VERSION_NOT_FOUND".to_string(),
                vec!["Reload the version list".to_string()],
                conversation_id,
            )))
        }
        Err(e) => {
            error!("Failed to restore version {}: {:#}", version_id, e);
            return Err(Json(StandardErrorResponse::new(
                "Failed to restore version".to_string(),
                "STORE_READ_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                conversation_id,
            )));
        }
    };

    match store.save_resume(&snapshot).await {
        Ok(restored) => {
            info!("Restored version {} for resume {}", version_id, resume_id);
            Ok(Json(DataResponse::success(
                "Version restored".to_string(),
                restored,
                conversation_id,
            )))
        }
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Restored snapshot could not be made current: {}", e),
            "STORE_WRITE_ERROR".to_string(),
            vec!["Retry the restore".to_string()],
            conversation_id,
        ))),
    }
}

pub async fn delete_version_handler(
    request: Json<StandardRequest<DeleteVersionRequest>>,
    history: &State<VersionHistory>,
) -> Result<Json<ActionResponse>, Json<StandardErrorResponse>> {
    let conversation_id = request.conversation_id();

    match history
        .delete_version(&request.data.version_id, &request.data.resume_id)
        .await
    {
        Ok(()) => Ok(Json(ActionResponse::success(
            "Version deleted".to_string(),
            "version-deleted".to_string(),
            conversation_id,
        ))),
        Err(e) => Err(Json(StandardErrorResponse::new(
            format!("Failed to delete version: {}", e),
            "STORE_WRITE_ERROR".to_string(),
            vec!["Try again in a few moments".to_string()],
            conversation_id,
        ))),
    }
}
