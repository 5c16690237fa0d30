//! Public inbox endpoints.
//!
//! GET  /inbx - usage hint
//! POST /inbx - store the raw request body as a new entry

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;

use crate::auth::ingest::IngestAuth;
use crate::entries::{retention, EntryMetadata};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body cap for ingestion.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// First hop of `X-Forwarded-For`, if it parses as an address.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<IpAddr>().ok())
}

/// Submitter address: forwarded client first, transport peer otherwise.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    forwarded_ip(headers).or(peer)
}

/// All request headers as lowercase name -> values, keeping repeated headers.
pub fn capture_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut captured: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        captured
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    captured
}

/// GET /inbx
pub async fn usage(State(state): State<AppState>) -> String {
    if state.post_token.is_enabled() {
        "POST text to this URL with the post token, for example:\n\
         \n  curl -u TOKEN: --data-binary @message.txt <this url>\n\
         \n  curl -H 'X-Inbx-Token: TOKEN' --data-binary @message.txt <this url>\n"
            .to_string()
    } else {
        "POST text to this URL, for example:\n\
         \n  curl --data-binary @message.txt <this url>\n"
            .to_string()
    }
}

/// POST /inbx
///
/// Auth → non-empty body → metadata capture → store → trim. A storage failure
/// returns 500 with nothing left on disk; a trim failure only gets logged since
/// the entry is already stored.
pub async fn ingest(
    State(state): State<AppState>,
    _auth: IngestAuth,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty body\n".into()));
    }

    // The store stamps the sidecar with the id's timestamp.
    let metadata = EntryMetadata::new(
        resolve_client_ip(&headers, Some(peer.ip())),
        Utc::now(),
        capture_headers(&headers),
        &body,
    );

    let entries = state.entries.clone();
    let max_entries = state.max_entries;

    let id = tokio::task::spawn_blocking(move || {
        let id = entries.store(&body, metadata)?;
        retention::enforce_retention(&entries, max_entries);
        Ok::<_, ApiError>(id)
    })
    .await??;

    tracing::info!("Stored entry {} from {}", id, peer);
    Ok((StatusCode::CREATED, "Stored\n"))
}
