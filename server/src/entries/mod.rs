//! Entry repository for the inbox.
//!
//! Every submission becomes a body file plus a JSON metadata sidecar, both named
//! after an `EntryId` that sorts by creation order. The repository holds at most
//! the configured number of entries; older ones are trimmed after each store.
//!
//! Storage layout: `{data_dir}/{id}.txt` and `{data_dir}/{id}.meta.json`.

pub mod id;
pub mod metadata;
pub mod retention;
pub mod store;

pub use id::EntryId;
pub use metadata::EntryMetadata;
pub use store::{EntryStore, StoreError};
