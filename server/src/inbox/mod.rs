//! Ingestion side of the inbox: anyone holding the post token (or anyone at all
//! while it is unset) can POST text, which is stored as a new entry.

pub mod routes;

pub use routes::MAX_BODY_BYTES;
