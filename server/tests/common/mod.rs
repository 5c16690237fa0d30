//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use inbx_server::auth::csrf::new_session_store;
use inbx_server::entries::EntryStore;
use inbx_server::state::AppState;

pub const VIEWER_USER: &str = "admin";
pub const VIEWER_PASSWORD: &str = "correct horse battery";

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    /// Keeps the data directory alive for the duration of the test
    pub data_dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn path(&self) -> &Path {
        self.data_dir.path()
    }
}

/// Start the server on a random port.
/// `post_token`: `Some("")` disables token auth, `None` generates a token.
pub async fn start_test_server(max_entries: usize, post_token: Option<&str>) -> TestServer {
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let secrets = inbx_server::secrets::bootstrap(
        data_dir.path(),
        VIEWER_USER,
        Some(VIEWER_PASSWORD),
        post_token,
    )
    .expect("Failed to bootstrap credentials");
    let entries = EntryStore::open(data_dir.path()).expect("Failed to open entry store");

    let state = AppState {
        entries: Arc::new(entries),
        post_token: secrets.post_token,
        viewer: secrets.viewer,
        sessions: new_session_store(),
        max_entries,
        public_url: None,
    };

    let app = inbx_server::routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        data_dir,
    }
}

/// Client that does not follow redirects, so 302s can be asserted.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().to_string();
            !name.starts_with('.') && name.ends_with(suffix)
        })
        .collect();
    files.sort();
    files
}

/// Entry body files in the data directory.
pub fn body_files(dir: &Path) -> Vec<PathBuf> {
    files_with_suffix(dir, ".txt")
}

/// Entry metadata sidecars in the data directory.
pub fn sidecar_files(dir: &Path) -> Vec<PathBuf> {
    files_with_suffix(dir, ".meta.json")
}

/// Stored bodies, oldest first.
pub fn stored_bodies(dir: &Path) -> Vec<String> {
    body_files(dir)
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect()
}
