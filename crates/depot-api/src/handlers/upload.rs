//! Upload session and folder-tree handlers.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use bytes::Bytes;
use uuid::Uuid;
use validator::Validate;

use depot_core::error::AppError;
use depot_service::upload::{InitiateUpload, ResourceKind};

use crate::dto::request::{
    CompleteUploadRequest, CreateFolderRequest, DeleteAllRequest, InitiateUploadRequest,
    ListParams, MoveEntryRequest, PauseParams,
};
use crate::dto::response::{
    AckResponse, CompleteResponse, DeleteResponse, EntryResponse, FolderResponse,
    InitiateUploadResponse, ListResponse, StatusResponse,
};
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /upload/initiate
pub async fn initiate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<InitiateUploadRequest>,
) -> Result<Json<InitiateUploadResponse>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;

    let kind = match req.resource_type.as_str() {
        "chunked" | "file" => ResourceKind::Chunked,
        "direct" => ResourceKind::Direct,
        other => {
            return Err(AppError::validation(format!(
                "Unknown resourceType '{other}' (expected \"chunked\" or \"direct\")"
            )));
        }
    };

    let initiated = state
        .upload_engine
        .initiate(
            auth.context(),
            InitiateUpload {
                name: req.file_name,
                size_bytes: req.file_size,
                parent: req.parent,
                content_hash: req.file_hash,
                kind,
            },
        )
        .await?;

    Ok(Json(InitiateUploadResponse {
        upload_id: initiated.upload_id,
        total_chunks: initiated.total_chunks,
        chunk_size: initiated.chunk_size_bytes,
        upload_url: initiated.upload_url,
    }))
}

/// POST /upload/chunk — multipart body with the binary chunk, uploadId,
/// and chunkIndex.
pub async fn upload_chunk(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<AckResponse>, AppError> {
    let mut upload_id: Option<Uuid> = None;
    let mut chunk_index: Option<i32> = None;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "uploadId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                upload_id = Some(
                    Uuid::parse_str(&text).map_err(|_| AppError::validation("Invalid uploadId"))?,
                );
            }
            "chunkIndex" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                chunk_index = Some(
                    text.parse::<i32>()
                        .map_err(|_| AppError::validation("Invalid chunkIndex"))?,
                );
            }
            "chunk" | "file" => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let upload_id = upload_id.ok_or_else(|| AppError::validation("uploadId is required"))?;
    let chunk_index = chunk_index.ok_or_else(|| AppError::validation("chunkIndex is required"))?;
    let data = data.ok_or_else(|| AppError::validation("chunk data is required"))?;

    let outcome = state
        .upload_engine
        .accept_chunk(auth.context(), upload_id, chunk_index, data)
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: if outcome.completed {
            "Upload completed".to_string()
        } else if outcome.accepted {
            format!("Chunk {chunk_index} accepted")
        } else {
            format!("Chunk {chunk_index} already accepted")
        },
    }))
}

/// PUT /upload/pause/{uploadId}?chunkIndex=N
pub async fn pause(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(upload_id): Path<Uuid>,
    Query(params): Query<PauseParams>,
) -> Result<Json<AckResponse>, AppError> {
    state
        .upload_engine
        .pause_chunk(auth.context(), upload_id, params.chunk_index)
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: format!("Upload paused; chunk {} will be re-sent", params.chunk_index),
    }))
}

/// GET /upload/status/{uploadId}
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let report = state.upload_engine.status(auth.context(), upload_id).await?;

    Ok(Json(StatusResponse {
        upload_id: report.upload_id,
        file_name: report.name,
        status: report.status,
        progress: report.progress_percent,
        is_complete: report.is_complete,
        uploaded_chunks: report.uploaded_chunks,
        total_chunks: report.total_chunks,
    }))
}

/// POST /upload/complete
pub async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CompleteUploadRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let completed = state
        .upload_engine
        .complete(auth.context(), req.upload_id)
        .await?;

    Ok(Json(CompleteResponse {
        success: true,
        remote_key: completed.remote_key,
        size: completed.size_bytes,
    }))
}

/// DELETE /upload/{uploadId}
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = state.upload_engine.remove(auth.context(), upload_id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        removed: result.removed,
    }))
}

/// DELETE /upload/all
pub async fn remove_all(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<DeleteAllRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let result = state
        .upload_engine
        .remove_many(auth.context(), &req.upload_ids)
        .await?;

    Ok(Json(DeleteResponse {
        success: true,
        removed: result.removed,
    }))
}

/// PUT /upload/move/{uploadId}
pub async fn move_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(upload_id): Path<Uuid>,
    Json(req): Json<MoveEntryRequest>,
) -> Result<Json<AckResponse>, AppError> {
    let moved = state
        .hierarchy
        .move_entry(auth.context(), upload_id, req.new_parent_id)
        .await?;

    Ok(Json(AckResponse {
        success: true,
        message: format!("'{}' moved", moved.name),
    }))
}

/// POST /upload/folder
pub async fn create_folder(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<FolderResponse>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;

    let folder = state
        .hierarchy
        .create_folder(auth.context(), &req.folder_name, req.parent)
        .await?;

    Ok(Json(FolderResponse {
        upload_id: folder.id,
    }))
}

/// GET /upload/all?folderId=
pub async fn list_children(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let folder_id = params
        .folder()
        .map_err(|_| AppError::validation("Invalid folderId"))?;

    let children = state
        .hierarchy
        .list_children(auth.context(), folder_id)
        .await?;

    Ok(Json(ListResponse {
        success: true,
        items: children.iter().map(EntryResponse::from).collect(),
    }))
}
