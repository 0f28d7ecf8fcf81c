//! Error taxonomy of the image core.
//!
//! Client-facing failures (validation, quota, unknown id) carry a specific
//! description. Everything else is internal: it is logged with full detail
//! by the caller and rendered to clients as one generic message.

use crate::accounts::StoreError;
use crate::imaging::{BackendError, ValidationError};
use crate::paths::PathError;
use axum::http::StatusCode;
use thiserror::Error;

pub const INTERNAL_ERROR_DESCRIPTION: &str =
    "Processing request failed because of an internal error";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("missing form field `{0}`")]
    MissingField(&'static str),
    #[error("image quota exceeded")]
    QuotaExceeded,
    #[error("image not found")]
    NotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("account store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ImageError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingField(_) | Self::QuotaExceeded => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message safe to show to clients.
    pub fn description(&self) -> String {
        match self {
            Self::Validation(ValidationError::UnsupportedFormat(_)) => {
                "Uploaded Image is not supported. Supported formats are jpeg, png, tiff and webp."
                    .to_string()
            }
            Self::Validation(ValidationError::TooLarge { max, .. }) => {
                format!("Image is too big the max dimension supported is {max} pixel.")
            }
            Self::Validation(ValidationError::TooSmall { min, .. }) => {
                format!("Image is too small the min dimension supported is {min} pixel.")
            }
            Self::MissingField(_) => "Bad request.".to_string(),
            Self::QuotaExceeded => "Quota Exceeded.".to_string(),
            Self::NotFound => "Image with such id was not found.".to_string(),
            _ => INTERNAL_ERROR_DESCRIPTION.to_string(),
        }
    }
}
