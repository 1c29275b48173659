//! services/api/src/lib.rs
//!
//! Library root for the academy API service, so the binaries and the
//! integration tests can share the adapters and web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
