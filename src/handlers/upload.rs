use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use serde::Serialize;
use utoipa::ToSchema;

use super::auth::AdminAuth;
use crate::errors::AppError;
use crate::infrastructure::uploads::ImageStore;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public path of the stored image, e.g. "/uploads/<uuid>.jpg"
    pub url: String,
}

/// POST /api/upload
///
/// Stores the first file field of a multipart form. Only image extensions are
/// accepted and the body is read no further than the configured size limit.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Image file field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing, empty, oversized or non-image file"),
        (status = 401, description = "Missing or wrong admin token"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn upload_image(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::BadRequest(e.to_string()))?;
        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
        else {
            continue;
        };
        let extension = ImageStore::image_extension(&filename)?;

        let limit = state.images.max_bytes();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(state.images.too_large().into());
            }
            bytes.extend_from_slice(&chunk);
        }

        let images = state.images.clone();
        let url = web::block(move || images.save(&extension, &bytes))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        return Ok(HttpResponse::Created().json(UploadResponse { url }));
    }

    Err(AppError::BadRequest(
        "multipart body has no file field".to_string(),
    ))
}
