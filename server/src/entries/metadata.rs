use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sidecar record written next to every entry body as `<id>.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Submitter address (forwarded client address when behind a proxy)
    pub ip: Option<String>,
    /// Receive time, ISO-8601 at second precision
    pub timestamp: DateTime<Utc>,
    /// Hex-encoded SHA-256 of the stored body
    pub sha256: String,
    pub size: usize,
    /// Every request header, lowercase name -> values in arrival order
    pub headers: BTreeMap<String, Vec<String>>,
}

impl EntryMetadata {
    pub fn new(
        ip: Option<IpAddr>,
        received_at: DateTime<Utc>,
        headers: BTreeMap<String, Vec<String>>,
        body: &[u8],
    ) -> Self {
        Self {
            ip: ip.map(|ip| ip.to_string()),
            timestamp: received_at.trunc_subsecs(0),
            sha256: sha256_hex(body),
            size: body.len(),
            headers,
        }
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
