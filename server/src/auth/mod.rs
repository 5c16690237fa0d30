//! Request authentication for the inbox.
//!
//! - Ingestion: shared post token via `X-Inbx-Token` or either Basic slot
//! - Viewer: Basic username + PBKDF2-verified password
//! - Viewer actions: additionally an anti-forgery token bound to a session cookie

pub mod csrf;
pub mod ingest;
pub mod password;
pub mod viewer;

use axum::http::HeaderMap;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};

/// Decode `Authorization: Basic`, treating a malformed header as absent.
pub fn basic_credentials(headers: &HeaderMap) -> Option<Authorization<Basic>> {
    headers.typed_get::<Authorization<Basic>>()
}
