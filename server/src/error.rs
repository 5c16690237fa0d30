use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::entries::StoreError;
use crate::secrets::SecretError;

/// Realm sent in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = r#"Basic realm="inbx", charset="UTF-8""#;

/// Handler-boundary error. Every variant becomes a status with a short
/// plaintext body.
#[derive(Debug)]
pub enum ApiError {
    /// 401; `challenge` adds a `WWW-Authenticate: Basic` header
    Unauthorized { challenge: bool },
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized { challenge } => {
                let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized\n").into_response();
                if challenge {
                    response.headers_mut().insert(
                        header::WWW_AUTHENTICATE,
                        HeaderValue::from_static(AUTH_REALM),
                    );
                }
                response
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::EmptyBody => ApiError::BadRequest("Empty body\n".into()),
            StoreError::NotFound(_) => ApiError::NotFound("Not found\n".into()),
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::Internal("Storage error\n".into())
            }
        }
    }
}

impl From<SecretError> for ApiError {
    fn from(error: SecretError) -> Self {
        tracing::error!("Credential storage error: {}", error);
        ApiError::Internal("Could not update credentials\n".into())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(error: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {}", error);
        ApiError::Internal("Internal error\n".into())
    }
}
