// ABOUTME: Upload API handlers for images and music, taking the multipart field `file`.
// ABOUTME: Returns the generated filename and its public URL; deletes go through the name validator.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use blogd_store::UploadKind;
use serde::Serialize;

use crate::app_state::SharedState;
use crate::envelope::{ApiError, ApiResult, Envelope};

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadReceipt {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedUpload {
    pub filename: String,
}

/// POST /api/v1/uploads/image
pub async fn upload_image(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadReceipt> {
    store_upload(&state, UploadKind::Image, multipart?).await
}

/// POST /api/v1/uploads/music
pub async fn upload_music(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadReceipt> {
    store_upload(&state, UploadKind::Music, multipart?).await
}

async fn store_upload(
    state: &SharedState,
    kind: UploadKind,
    mut multipart: Multipart,
) -> ApiResult<UploadReceipt> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        let filename = state
            .uploads
            .store(kind, &bytes, original_name.as_deref())?;
        let url = format!("/uploads/{}/{}", kind.url_segment(), filename);
        return Ok(Envelope::success(UploadReceipt { filename, url }));
    }
    Err(ApiError::InvalidInput(format!(
        "missing multipart field `{}`",
        FILE_FIELD
    )))
}

/// DELETE /api/v1/uploads/images/{*name}
pub async fn delete_image(
    State(state): State<SharedState>,
    name: Result<Path<String>, PathRejection>,
) -> ApiResult<RemovedUpload> {
    let Path(name) = name?;
    remove_upload(&state, UploadKind::Image, name)
}

/// DELETE /api/v1/uploads/music/{*name}
pub async fn delete_music(
    State(state): State<SharedState>,
    name: Result<Path<String>, PathRejection>,
) -> ApiResult<RemovedUpload> {
    let Path(name) = name?;
    remove_upload(&state, UploadKind::Music, name)
}

fn remove_upload(state: &SharedState, kind: UploadKind, name: String) -> ApiResult<RemovedUpload> {
    if !state.uploads.remove(kind, &name)? {
        return Err(ApiError::not_found(format!("file {}", name)));
    }
    Ok(Envelope::success(RemovedUpload { filename: name }))
}
