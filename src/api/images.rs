use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::identity::Caller;
use super::{ApiError, AppState};
use crate::error::ImageError;
use crate::service::ImageSummary;

/// Query string of `GET /images`. Values stay raw strings so malformed
/// widths fall back to the canonical image instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ImagesQuery {
    pub id: Option<String>,
    pub width: Option<String>,
    pub thumbnail: Option<String>,
}

impl ImagesQuery {
    fn image_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn requested_width(&self) -> Option<u32> {
        self.width.as_deref().and_then(|w| w.trim().parse().ok())
    }

    fn wants_thumbnail(&self) -> bool {
        self.thumbnail.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

/// `GET /images`: the caller's image list, or one image's bytes.
pub async fn get_images(
    State(state): State<AppState>,
    Caller(account): Caller,
    Query(query): Query<ImagesQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let Some(image_id) = query.image_id() else {
        return Ok(Json(state.service.list(&account)).into_response());
    };

    let path = state
        .service
        .fetch(
            &account,
            image_id,
            query.requested_width(),
            query.wants_thumbnail(),
        )
        .await
        .map_err(ApiError::image("fetch", &account.user_id))?;

    serve_artifact(&path, request)
        .await
        .map_err(ApiError::image("fetch", &account.user_id))
}

/// Stream a resolved artifact. The record was found, so a file that
/// disappears before it is opened (e.g. a concurrent delete) is an internal
/// failure rather than a missing image.
async fn serve_artifact(path: &Path, request: Request) -> Result<Response, ImageError> {
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = response.status();
    if status == StatusCode::NOT_FOUND || status.is_server_error() {
        return Err(ImageError::Io(io::Error::other(format!(
            "artifact {} could not be served: {status}",
            path.display()
        ))));
    }
    Ok(response.map(Body::new))
}

/// `POST /images`: multipart upload with `name` and `image` fields.
pub async fn upload_image(
    State(state): State<AppState>,
    Caller(account): Caller,
    mut multipart: Multipart,
) -> Result<Json<ImageSummary>, ApiError> {
    let mut name = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?,
                );
            }
            "image" => {
                image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?,
                );
            }
            _ => {}
        }
    }

    let record = state
        .service
        .upload(&account, name, image)
        .await
        .map_err(ApiError::image("upload", &account.user_id))?;
    Ok(Json(ImageSummary::from(&record)))
}

/// `DELETE /images`: body `{"images": [id, ...]}`.
pub async fn delete_images(
    State(state): State<AppState>,
    Caller(account): Caller,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidJson(e.body_text()))?;
    let deleted = state
        .service
        .delete(&account, request.images)
        .await
        .map_err(ApiError::image("delete", &account.user_id))?;
    Ok(Json(DeleteResponse { deleted }))
}
