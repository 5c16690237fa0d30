//! Entry identity.
//!
//! An `EntryId` is `(timestamp, sequence, nonce)`:
//! - `timestamp`: UTC second of the sequence value
//! - `sequence`: nanoseconds on a monotonic clock anchored to the Unix epoch at
//!   generator start, forced strictly increasing per generator
//! - `nonce`: 32 random bits, keeps ids unique across concurrent processes
//!
//! Text form: `YYYYMMDDTHHMMSSZ-<16 hex>-<8 hex>`. All fields are fixed width, so
//! lexicographic order of the text form equals the `Ord` of the type.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rand::Rng;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const TIMESTAMP_LEN: usize = 16;
const SEQUENCE_LEN: usize = 16;
const NONCE_LEN: usize = 8;

/// Length of the canonical text form.
pub const ENTRY_ID_LEN: usize = TIMESTAMP_LEN + 1 + SEQUENCE_LEN + 1 + NONCE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    timestamp: DateTime<Utc>,
    sequence: u64,
    nonce: u32,
}

impl EntryId {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:016x}-{:08x}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.sequence,
            self.nonce
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntryId;

impl fmt::Display for InvalidEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a well-formed entry id")
    }
}

impl std::error::Error for InvalidEntryId {}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl FromStr for EntryId {
    type Err = InvalidEntryId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENTRY_ID_LEN || !s.is_ascii() {
            return Err(InvalidEntryId);
        }

        let (timestamp, rest) = s.split_at(TIMESTAMP_LEN);
        let sequence = rest.strip_prefix('-').ok_or(InvalidEntryId)?;
        let (sequence, rest) = sequence.split_at(SEQUENCE_LEN);
        let nonce = rest.strip_prefix('-').ok_or(InvalidEntryId)?;

        if !is_lower_hex(sequence) || !is_lower_hex(nonce) {
            return Err(InvalidEntryId);
        }

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| InvalidEntryId)?
            .and_utc();
        let id = EntryId {
            timestamp,
            sequence: u64::from_str_radix(sequence, 16).map_err(|_| InvalidEntryId)?,
            nonce: u32::from_str_radix(nonce, 16).map_err(|_| InvalidEntryId)?,
        };

        // Reject anything that would not render back to the same name.
        if id.to_string() != s {
            return Err(InvalidEntryId);
        }
        Ok(id)
    }
}

/// Issues strictly increasing entry ids.
#[derive(Debug)]
pub struct EntryIdGenerator {
    origin: Instant,
    epoch_offset_nanos: u64,
    last: AtomicU64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        let epoch_offset_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            epoch_offset_nanos,
            last: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        let now = self
            .epoch_offset_nanos
            .saturating_add(self.origin.elapsed().as_nanos() as u64);
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    /// Next id. The timestamp is the second of the sequence value itself, so
    /// timestamp and sequence advance together and the text form sorts in
    /// issue order.
    pub fn next(&self) -> EntryId {
        let sequence = self.next_sequence();
        EntryId {
            timestamp: DateTime::from_timestamp_nanos(sequence as i64).trunc_subsecs(0),
            sequence,
            nonce: rand::rng().random(),
        }
    }
}

impl Default for EntryIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
