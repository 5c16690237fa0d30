use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::basic_credentials;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated viewer, extracted from `Authorization: Basic`.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone)]
pub struct ViewerAuth {
    pub username: String,
}

impl FromRequestParts<AppState> for ViewerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let creds =
            basic_credentials(&parts.headers).ok_or(ApiError::Unauthorized { challenge: true })?;
        let username = creds.username().to_string();
        let password = creds.password().to_string();

        // PBKDF2 is deliberately slow; keep it off the async workers.
        let viewer = state.viewer.clone();
        let candidate = username.clone();
        let verified =
            tokio::task::spawn_blocking(move || viewer.verify(&candidate, &password)).await?;

        if verified {
            Ok(ViewerAuth { username })
        } else {
            tracing::info!("Rejected viewer login for '{}'", username);
            Err(ApiError::Unauthorized { challenge: true })
        }
    }
}
