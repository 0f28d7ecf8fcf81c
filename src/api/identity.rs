//! Caller identity.
//!
//! Authentication happens upstream. The gateway in front of this server
//! verifies the caller and forwards their user id in a trusted header
//! (`auth.user_header`); this extractor resolves it to an [`Account`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::{ApiError, AppState};
use crate::accounts::Account;

/// The authenticated caller's account, as of the start of the request.
#[derive(Debug, Clone)]
pub struct Caller(pub Account);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user_id = parts
            .headers
            .get(&state.user_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", state.user_header)))?
            .to_string();

        let account = state
            .service
            .store()
            .account(&user_id)
            .await
            .map_err(|e| ApiError::image("authenticate", &user_id)(e.into()))?
            .ok_or_else(|| ApiError::Unauthorized(format!("unknown account {user_id}")))?;

        Ok(Caller(account))
    }
}
