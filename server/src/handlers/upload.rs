use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use axum_extra::extract::WithRejection;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::UploadResponse;
use crate::services::{UploadService, UploadedFile};

/// Multipart field carrying the images.
const FIELD: &str = "images";

pub async fn upload_images(
    State(uploads): State<Arc<UploadService>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    let image_urls = uploads.store_images(files).await?;
    tracing::info!(user_id = %actor.id, count = image_urls.len(), "images uploaded");
    Ok(Json(UploadResponse { image_urls }))
}
