//! Password-protected viewer: browse stored entries and manage the post token.

pub mod render;
pub mod routes;
