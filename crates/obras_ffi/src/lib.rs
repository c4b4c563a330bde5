//! Flutter-facing bindings for the Obras record store.

pub mod api;
