//! Anti-forgery tokens for state-changing viewer actions.
//!
//! Rendering the viewer starts (or resumes) a session: a random id in the
//! `inbx_session` cookie mapped server-side to a random CSRF token. The token is
//! embedded in the page's forms and must come back in the `csrf_token` form field
//! together with the cookie. Expired sessions are pruned whenever a new one is
//! issued.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use subtle::ConstantTimeEq;

pub const SESSION_COOKIE: &str = "inbx_session";
pub const CSRF_FIELD: &str = "csrf_token";
pub const SESSION_TTL_HOURS: i64 = 12;

/// Session stored in memory with expiry
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Session id -> session (DashMap for concurrent access)
pub type SessionStore = Arc<DashMap<String, SessionEntry>>;

pub fn new_session_store() -> SessionStore {
    Arc::new(DashMap::new())
}

fn random_hex() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Anti-forgery token for the caller's session, starting a new session when
/// the cookie is missing, unknown or expired.
pub fn session_token(sessions: &SessionStore, jar: CookieJar, secure: bool) -> (CookieJar, String) {
    let now = Utc::now();

    let existing = jar.get(SESSION_COOKIE).and_then(|cookie| {
        sessions
            .get(cookie.value())
            .filter(|session| session.expires_at > now)
            .map(|session| session.csrf_token.clone())
    });
    if let Some(token) = existing {
        return (jar, token);
    }

    sessions.retain(|_, session| session.expires_at > now);

    let session_id = random_hex();
    let csrf_token = random_hex();
    sessions.insert(
        session_id.clone(),
        SessionEntry {
            csrf_token: csrf_token.clone(),
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        },
    );

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/inbx")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .build();
    (jar.add(cookie), csrf_token)
}

/// Whether `submitted` is the live anti-forgery token of the cookie's session.
pub fn verify_csrf(sessions: &SessionStore, jar: &CookieJar, submitted: Option<&str>) -> bool {
    let Some(submitted) = submitted.filter(|token| !token.is_empty()) else {
        return false;
    };
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return false;
    };
    let Some(session) = sessions.get(cookie.value()) else {
        return false;
    };
    if session.expires_at <= Utc::now() {
        return false;
    }
    submitted
        .as_bytes()
        .ct_eq(session.csrf_token.as_bytes())
        .into()
}
