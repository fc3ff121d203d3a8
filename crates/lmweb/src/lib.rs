//! `lmweb` crate (library surface).
//!
//! The primary entrypoint for end users is the `lmweb` binary (CLI + `/ask` server).
//! This library module exists to support embedding the `/ask` router and to re-export the
//! core and local crates without depending on internal crate layout.

pub use lmweb_core as core;
pub use lmweb_local as local;

pub mod server;
