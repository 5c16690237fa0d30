use axum::{extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;

use crate::auth::basic_credentials;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the post token.
pub const POST_TOKEN_HEADER: &str = "x-inbx-token";

fn token_eq(candidate: &str, token: &str) -> bool {
    candidate.as_bytes().ct_eq(token.as_bytes()).into()
}

/// Ingestion acceptance rule.
///
/// With an empty `current_token` every request is accepted. Otherwise the token
/// must appear in the dedicated header, or as the Basic username, or as the
/// Basic password (`curl -u TOKEN:` and `curl -u x:TOKEN` both work).
pub fn is_valid_ingestion_credential(
    header_token: Option<&str>,
    basic_user: Option<&str>,
    basic_pass: Option<&str>,
    current_token: &str,
) -> bool {
    if current_token.is_empty() {
        return true;
    }
    [header_token, basic_user, basic_pass]
        .into_iter()
        .flatten()
        .any(|candidate| token_eq(candidate, current_token))
}

/// Extractor guarding `POST /inbx`. Rejects with a plain 401.
#[derive(Debug, Clone, Copy)]
pub struct IngestAuth;

impl FromRequestParts<AppState> for IngestAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = state.post_token.current();
        let header_token = parts
            .headers
            .get(POST_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        let basic = basic_credentials(&parts.headers);
        let (basic_user, basic_pass) = match &basic {
            Some(creds) => (Some(creds.username()), Some(creds.password())),
            None => (None, None),
        };

        if is_valid_ingestion_credential(header_token, basic_user, basic_pass, &current) {
            Ok(IngestAuth)
        } else {
            tracing::debug!("Rejected ingestion: missing or wrong post token");
            Err(ApiError::Unauthorized { challenge: false })
        }
    }
}
