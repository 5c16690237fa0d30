use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::auth::password::{self, PASSWORD_SCHEME};
use crate::secrets::{write_restricted, SecretError};

pub const VIEWER_CREDENTIAL_FILE: &str = ".viewer_credential.json";

/// On-disk form of the viewer credential. Never contains the plaintext.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    username: String,
    password_hash: String,
    scheme: String,
    created_at: DateTime<Utc>,
}

/// Username + PBKDF2 hash gating the viewer.
#[derive(Debug, Clone)]
pub struct ViewerCredential {
    username: String,
    password_hash: String,
}

pub struct ViewerBootstrap {
    pub credential: ViewerCredential,
    pub generated_password: Option<String>,
}

impl ViewerCredential {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    /// Resolve the viewer credential at startup.
    ///
    /// A configured password is hashed in memory and never written. Otherwise a
    /// stored record for `username` is reused, or a new random password is
    /// generated, hashed and persisted; its plaintext is handed back once for the
    /// startup log.
    pub fn bootstrap(
        data_dir: &Path,
        username: &str,
        override_password: Option<&str>,
    ) -> Result<ViewerBootstrap, SecretError> {
        if let Some(password) = override_password.filter(|p| !p.is_empty()) {
            tracing::info!("Viewer password set from configuration");
            return Ok(ViewerBootstrap {
                credential: Self::new(username, password::hash_password(password)),
                generated_password: None,
            });
        }

        let path = data_dir.join(VIEWER_CREDENTIAL_FILE);
        if let Some(credential) = load_record(&path, username)? {
            tracing::info!("Viewer credential loaded from {}", path.display());
            return Ok(ViewerBootstrap {
                credential,
                generated_password: None,
            });
        }

        let generated = password::generate_password();
        let record = CredentialRecord {
            username: username.to_string(),
            password_hash: password::hash_password(&generated),
            scheme: PASSWORD_SCHEME.to_string(),
            created_at: Utc::now(),
        };
        write_restricted(&path, &serde_json::to_vec_pretty(&record)?)?;
        tracing::info!("Viewer credential generated at {}", path.display());

        Ok(ViewerBootstrap {
            credential: Self::new(record.username, record.password_hash),
            generated_password: Some(generated),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a Basic username/password pair. Hash errors count as a mismatch.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_matches: bool = username.as_bytes().ct_eq(self.username.as_bytes()).into();
        let password_matches = match password::verify_password(password, &self.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Viewer password hash could not be verified: {}", e);
                false
            }
        };
        user_matches && password_matches
    }
}

/// Read a stored record, returning `None` when it is absent, malformed, or for
/// a different username.
fn load_record(path: &Path, username: &str) -> Result<Option<ViewerCredential>, SecretError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SecretError::io(path, e)),
    };

    let record: CredentialRecord = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Ignoring unreadable viewer credential file: {}", e);
            return Ok(None);
        }
    };

    if record.username != username {
        tracing::warn!(
            "Stored viewer credential is for '{}', configured user is '{}'; regenerating",
            record.username,
            username
        );
        return Ok(None);
    }
    if record.scheme != PASSWORD_SCHEME || password::validate_hash(&record.password_hash).is_err() {
        tracing::warn!("Stored viewer credential hash is malformed; regenerating");
        return Ok(None);
    }

    Ok(Some(ViewerCredential::new(record.username, record.password_hash)))
}
