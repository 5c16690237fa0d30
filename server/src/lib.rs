//! inbx server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod config;
pub mod entries;
pub mod error;
pub mod inbox;
pub mod routes;
pub mod secrets;
pub mod state;
pub mod viewer;
