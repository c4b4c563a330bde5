//! Core use-case services.
//!
//! # Responsibility
//! - Turn raw form input into validated record store calls.
//! - Expose read-only snapshots of the hierarchy to presentation layers.
//! - Keep FFI/UI layers decoupled from storage details.

pub mod query;
pub mod record_service;
