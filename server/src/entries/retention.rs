//! Retention enforcement for the entry store.
//!
//! Runs inline after every successful store instead of on a timer. A failed or
//! partial trim is logged and left for the next ingestion to finish, since that
//! call re-counts the directory from scratch.

use crate::entries::store::EntryStore;

/// Trim `store` down to `max_entries`, logging the outcome.
///
/// Returns the number of entries removed, or 0 when trimming failed.
pub fn enforce_retention(store: &EntryStore, max_entries: usize) -> usize {
    match store.trim(max_entries) {
        Ok(0) => {
            tracing::debug!("Retention: within window of {} entries", max_entries);
            0
        }
        Ok(count) => {
            tracing::info!(
                "Retention: removed {} entries beyond window of {}",
                count,
                max_entries
            );
            count
        }
        Err(e) => {
            tracing::warn!("Retention trim failed: {}", e);
            0
        }
    }
}
