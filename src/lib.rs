//! showcache library
//!
//! Exposes the cache, upstream client and server modules for use by the
//! binary and by integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod server;
pub mod upstream;
