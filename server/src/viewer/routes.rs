//! Viewer endpoints (Basic auth required on all of them).
//!
//! GET  /inbx/view            - entries newest first, current token, examples
//! GET  /inbx/view/{id}       - raw body of one entry
//! POST /inbx/token/generate  - rotate the post token (anti-forgery token required)
//! POST /inbx/token/unset     - disable the post token (anti-forgery token required)

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::auth::csrf;
use crate::auth::viewer::ViewerAuth;
use crate::entries::{EntryId, StoreError};
use crate::error::ApiError;
use crate::secrets::post_token::generate_post_token;
use crate::state::AppState;
use crate::viewer::render::{self, ViewEntry, ViewPage};

const VIEW_PATH: &str = "/inbx/view";

#[derive(Debug, Deserialize)]
pub struct TokenActionForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

fn is_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// URL clients should POST to, for the example commands.
fn submission_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.public_url {
        return format!("{}/inbx", base.trim_end_matches('/'));
    }
    let scheme = if is_https(headers) { "https" } else { "http" };
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}/inbx", scheme, host)
}

/// GET /inbx/view
pub async fn view_page(
    State(state): State<AppState>,
    _viewer: ViewerAuth,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let entries = state.entries.clone();

    let view_entries = tokio::task::spawn_blocking(move || {
        let mut shown = Vec::new();
        for id in entries.list()? {
            let (body, modified) = match entries.read(&id) {
                Ok(read) => read,
                // Trimmed between listing and reading
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let ip = match entries.read_metadata(&id) {
                Ok(metadata) => metadata.and_then(|m| m.ip),
                Err(e) => {
                    tracing::warn!("Unreadable metadata for entry {}: {}", id, e);
                    None
                }
            };
            shown.push(ViewEntry {
                id: id.to_string(),
                modified,
                ip,
                size: body.len(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok::<_, StoreError>(shown)
    })
    .await??;

    let (jar, csrf_token) = csrf::session_token(&state.sessions, jar, is_https(&headers));
    let post_token = state.post_token.current();
    let page = ViewPage {
        entries: view_entries,
        examples: render::example_commands(&submission_url(&state, &headers), &post_token),
        post_token,
        csrf_token,
    };

    Ok((jar, Html(render::render_view(&page))))
}

/// GET /inbx/view/{id}
pub async fn view_entry(
    State(state): State<AppState>,
    _viewer: ViewerAuth,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: EntryId = id
        .parse()
        .map_err(|_| ApiError::NotFound("Not found\n".into()))?;

    let entries = state.entries.clone();
    let (body, _) = tokio::task::spawn_blocking(move || entries.read(&id)).await??;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response())
}

fn require_csrf(
    state: &AppState,
    jar: &CookieJar,
    form: Result<Form<TokenActionForm>, FormRejection>,
) -> Result<(), ApiError> {
    let submitted = form.ok().and_then(|Form(form)| form.csrf_token);
    if csrf::verify_csrf(&state.sessions, jar, submitted.as_deref()) {
        Ok(())
    } else {
        tracing::warn!("Rejected viewer action: missing or invalid anti-forgery token");
        Err(ApiError::Forbidden("Invalid anti-forgery token\n".into()))
    }
}

async fn set_post_token(state: &AppState, new_token: String) -> Result<(), ApiError> {
    let post_token = state.post_token.clone();
    tokio::task::spawn_blocking(move || post_token.rotate(&new_token)).await??;
    Ok(())
}

fn redirect_to_view() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, VIEW_PATH)]).into_response()
}

/// POST /inbx/token/generate
pub async fn generate_token(
    State(state): State<AppState>,
    viewer: ViewerAuth,
    jar: CookieJar,
    form: Result<Form<TokenActionForm>, FormRejection>,
) -> Result<Response, ApiError> {
    require_csrf(&state, &jar, form)?;
    set_post_token(&state, generate_post_token()).await?;
    tracing::info!("Post token rotated by viewer '{}'", viewer.username);
    Ok(redirect_to_view())
}

/// POST /inbx/token/unset
pub async fn unset_token(
    State(state): State<AppState>,
    viewer: ViewerAuth,
    jar: CookieJar,
    form: Result<Form<TokenActionForm>, FormRejection>,
) -> Result<Response, ApiError> {
    require_csrf(&state, &jar, form)?;
    set_post_token(&state, String::new()).await?;
    tracing::info!("Post token disabled by viewer '{}'", viewer.username);
    Ok(redirect_to_view())
}
