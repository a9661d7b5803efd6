//! Image uploads.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::interaction::{Rejection, is_image_payload};
use crate::store::UploadedImage;

use super::super::state::AppState;
use super::ApiError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

/// POST /api/images - store an image and return its URL.
///
/// Expects a multipart field named `image`. Anything that is not an image
/// is refused with 415 and nothing is stored.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?;
        upload = Some(UploadedImage {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No image field found"))?;
    if !is_image_payload(&upload) {
        let rejection = Rejection::NotAnImage {
            file_name: upload.file_name.clone(),
        };
        debug!(file = ?upload.file_name, "Rejected non-image upload");
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            rejection.to_string(),
        ));
    }

    let size = upload.bytes.len();
    let url = state.images.upload(upload).await?;
    info!(%url, bytes = size, "Image uploaded");
    Ok(Json(UploadResponse { success: true, url }))
}
