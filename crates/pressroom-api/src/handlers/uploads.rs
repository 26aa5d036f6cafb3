//! Image upload handler

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::AppState;
use crate::error::{api_error, validation, ApiResult};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored image
    pub url: String,
}

/// Store the raw request body as an image
///
/// POST /api/v1/uploads?filename=...
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    tag = "uploads",
    params(("filename" = String, Query, description = "Original file name, used for the extension")),
    request_body(content = String, description = "Raw image bytes", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 500, description = "Upload failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if query.filename.trim().is_empty() {
        return Err(validation("filename is required"));
    }

    match state.uploads.upload(query.filename.trim(), &body).await {
        Ok(url) => {
            state.metrics.record_upload(true);
            Ok((StatusCode::CREATED, Json(UploadResponse { url })))
        }
        Err(e) => {
            state.metrics.record_upload(false);
            Err(api_error(e))
        }
    }
}
