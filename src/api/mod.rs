//! HTTP surface.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/images` | list, or stream one image (`id`, `width`, `thumbnail`) |
//! | `POST` | `/images` | multipart upload (`name`, `image`) |
//! | `DELETE` | `/images` | delete `{"images": [...]}` |
//! | `GET` | `/health` | liveness |
//!
//! Every error body is `{"description": "..."}`.

pub mod health;
pub mod identity;
pub mod images;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::error::ImageError;
use crate::service::ImageService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ImageService>,
    /// Trusted header carrying the caller's user id.
    pub user_header: HeaderName,
    /// Request body limit for uploads.
    pub max_upload_bytes: usize,
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/images",
            get(images::get_images)
                .post(images::upload_image)
                .delete(images::delete_images),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A core operation failed for an identified caller.
    #[error("{operation} failed for user {user}: {source}")]
    Image {
        operation: &'static str,
        user: String,
        #[source]
        source: ImageError,
    },

    /// Missing identity header or unknown account.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed multipart body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Delete body is not the expected JSON object.
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
}

impl ApiError {
    /// Adapter for `map_err` that tags a core error with its context.
    pub fn image(operation: &'static str, user: &str) -> impl FnOnce(ImageError) -> Self {
        let user = user.to_string();
        move |source| Self::Image {
            operation,
            user,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Image { source, .. } => source.status(),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Image { source, .. } => source.description(),
            Self::Unauthorized(_) => "Unauthorized.".to_string(),
            Self::BadRequest(_) => "Bad request.".to_string(),
            Self::InvalidJson(_) => "Invalid JSON object.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let description = self.description();

        match &self {
            Self::Image {
                operation,
                user,
                source,
            } if source.is_internal() => {
                tracing::error!(operation = *operation, user = %user, error = %source, "request failed");
            }
            Self::Image {
                operation,
                user,
                source,
            } => {
                tracing::warn!(operation = *operation, user = %user, error = %source, "request rejected");
            }
            other => {
                tracing::warn!(error = %other, "request rejected");
            }
        }

        (status, Json(serde_json::json!({ "description": description }))).into_response()
    }
}
