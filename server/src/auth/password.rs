//! PBKDF2-HMAC-SHA256 password hashing for the viewer credential.
//!
//! Encoded form: `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`.
//! The iteration count travels with the hash, so raising the default only
//! affects newly generated credentials.

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Scheme tag stored alongside every hash.
pub const PASSWORD_SCHEME: &str = "pbkdf2_sha256";

/// Iterations used for new hashes.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// Hashes below this count are refused rather than verified.
pub const MIN_PBKDF2_ITERATIONS: u32 = 120_000;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("malformed password hash")]
    Malformed,

    #[error("unsupported password scheme: {0}")]
    UnsupportedScheme(String),

    #[error("password hash uses {0} iterations, minimum is {MIN_PBKDF2_ITERATIONS}")]
    TooFewIterations(u32),
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse(encoded: &str) -> Result<ParsedHash, PasswordError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::Malformed);
    };

    if scheme != PASSWORD_SCHEME {
        return Err(PasswordError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| PasswordError::Malformed)?;
    if iterations < MIN_PBKDF2_ITERATIONS {
        return Err(PasswordError::TooFewIterations(iterations));
    }
    let salt = hex::decode(salt).map_err(|_| PasswordError::Malformed)?;
    let hash = hex::decode(hash).map_err(|_| PasswordError::Malformed)?;
    if salt.is_empty() || hash.len() != HASH_LEN {
        return Err(PasswordError::Malformed);
    }

    Ok(ParsedHash {
        iterations,
        salt,
        hash,
    })
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{}${}${}${}",
        PASSWORD_SCHEME,
        PBKDF2_ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Check that `encoded` is a hash this module can verify.
pub fn validate_hash(encoded: &str) -> Result<(), PasswordError> {
    parse(encoded).map(|_| ())
}

/// Verify `password` against an encoded hash in constant time.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let parsed = parse(encoded)?;
    let candidate = derive(password, &parsed.salt, parsed.iterations);
    Ok(candidate[..].ct_eq(&parsed.hash[..]).into())
}

/// Generate a random alphanumeric password for first boot.
pub fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut rng = rand::rng();
    (0..20)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
