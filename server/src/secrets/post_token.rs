use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rand::Rng;

use crate::secrets::{write_restricted, SecretError};

pub const POST_TOKEN_FILE: &str = ".post_token";

/// Random bytes behind a generated token (hex-encoded to twice the length).
pub const POST_TOKEN_BYTES: usize = 24;

/// Generate a random post token, hex-encoded.
pub fn generate_post_token() -> String {
    let bytes: [u8; POST_TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Shared post token: the persisted file plus the in-memory value every
/// ingestion request checks against.
#[derive(Debug)]
pub struct PostToken {
    path: PathBuf,
    current: RwLock<String>,
}

impl PostToken {
    /// Resolve the post token at startup.
    ///
    /// - `Some(value)`: persisted with surrounding whitespace trimmed; `""` disables token auth
    /// - `None`: reuse the persisted token, generating one only when no file exists
    pub fn bootstrap(data_dir: &Path, override_token: Option<&str>) -> Result<Self, SecretError> {
        let path = data_dir.join(POST_TOKEN_FILE);

        let token = match override_token {
            Some(token) => {
                // Stored tokens are trimmed on read; trim here so a restart
                // without the override sees the same value.
                let token = token.trim();
                write_restricted(&path, token.as_bytes())?;
                tracing::info!("Post token set from configuration");
                token.to_string()
            }
            None => match fs::read_to_string(&path) {
                Ok(stored) => {
                    tracing::info!("Post token loaded from {}", path.display());
                    stored.trim().to_string()
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let token = generate_post_token();
                    write_restricted(&path, token.as_bytes())?;
                    tracing::info!("Post token generated at {}", path.display());
                    token
                }
                Err(e) => return Err(SecretError::io(&path, e)),
            },
        };

        Ok(Self {
            path,
            current: RwLock::new(token),
        })
    }

    /// The token in effect; empty when ingestion is unauthenticated.
    pub fn current(&self) -> String {
        match self.current.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.current().is_empty()
    }

    /// Replace the token. An empty `new_token` disables token auth and removes
    /// the file.
    ///
    /// The write lock is held across persistence, so concurrent readers see the
    /// old token until the new one is on disk. On failure the old token stays.
    pub fn rotate(&self, new_token: &str) -> Result<(), SecretError> {
        let mut current = self.current.write().map_err(|_| SecretError::LockPoisoned)?;

        if new_token.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(SecretError::io(&self.path, e)),
            }
        } else {
            write_restricted(&self.path, new_token.as_bytes())?;
        }

        *current = new_token.to_string();
        Ok(())
    }
}
