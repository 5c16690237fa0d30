use std::sync::Arc;

use crate::auth::csrf::SessionStore;
use crate::entries::EntryStore;
use crate::secrets::{PostToken, ViewerCredential};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Entry repository rooted at the data directory
    pub entries: Arc<EntryStore>,
    /// Post token gating ingestion; rotated from the viewer
    pub post_token: Arc<PostToken>,
    /// Viewer username + PBKDF2 hash
    pub viewer: Arc<ViewerCredential>,
    /// Viewer sessions and their anti-forgery tokens
    pub sessions: SessionStore,
    /// Retention window
    pub max_entries: usize,
    /// Externally visible base URL for example commands, e.g. `https://example.org`
    pub public_url: Option<String>,
}
