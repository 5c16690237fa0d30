//! Credential bootstrap for the inbox.
//!
//! Two artifacts live in the data directory next to the entries:
//! - `.post_token`: plaintext shared secret gating ingestion (empty = disabled)
//! - `.viewer_credential.json`: viewer username + PBKDF2 hash
//!
//! Both are written owner-only (0600 on unix) through a temp file + rename.
//! `bootstrap` runs once at startup; afterwards the post token changes only
//! through `PostToken::rotate`.

pub mod post_token;
pub mod viewer;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::auth::password::PasswordError;

pub use post_token::PostToken;
pub use viewer::ViewerCredential;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credential record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("password hash error: {0}")]
    Password(#[from] PasswordError),

    #[error("post token lock poisoned")]
    LockPoisoned,
}

impl SecretError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        SecretError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Credentials resolved at startup.
pub struct Secrets {
    pub post_token: Arc<PostToken>,
    pub viewer: Arc<ViewerCredential>,
    /// Plaintext of a freshly generated viewer password. Shown once in the
    /// startup log, never persisted.
    pub generated_password: Option<String>,
}

/// Resolve both credentials for `data_dir`.
///
/// Any persistence failure is returned; callers treat it as fatal since a
/// generated viewer password that was not saved cannot be recovered.
pub fn bootstrap(
    data_dir: &Path,
    viewer_user: &str,
    viewer_password: Option<&str>,
    post_token: Option<&str>,
) -> Result<Secrets, SecretError> {
    fs::create_dir_all(data_dir).map_err(|e| SecretError::io(data_dir, e))?;

    let post_token = PostToken::bootstrap(data_dir, post_token)?;
    let viewer = ViewerCredential::bootstrap(data_dir, viewer_user, viewer_password)?;

    Ok(Secrets {
        post_token: Arc::new(post_token),
        viewer: Arc::new(viewer.credential),
        generated_password: viewer.generated_password,
    })
}

/// Atomically replace `path` with `contents`, readable by the owner only.
pub(crate) fn write_restricted(path: &Path, contents: &[u8]) -> Result<(), SecretError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("secret");
    let tmp = path.with_file_name(format!("{file_name}.tmp"));

    // A leftover temp file would keep its old mode.
    let _ = fs::remove_file(&tmp);

    let result = (|| {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        SecretError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_is_idempotent_across_restarts() {
        let dir = tempfile::tempdir().unwrap();

        let first = bootstrap(dir.path(), "admin", None, None).unwrap();
        let token = first.post_token.current();
        assert!(first.generated_password.is_some());
        drop(first);

        let second = bootstrap(dir.path(), "admin", None, None).unwrap();
        assert_eq!(second.post_token.current(), token);
        assert!(second.generated_password.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_credential_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        bootstrap(dir.path(), "admin", None, None).unwrap();

        for name in [post_token::POST_TOKEN_FILE, viewer::VIEWER_CREDENTIAL_FILE] {
            let mode = fs::metadata(dir.path().join(name))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600, "{name} should be 0600");
        }
    }
}
