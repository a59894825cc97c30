//! Initiative tracker library.
//!
//! Exposes the roster model, the encounter store and its collaborators,
//! and the protocol modules for use by integration tests and the binary
//! entry points.

pub mod config;
pub mod edit;
pub mod input;
pub mod protocol;
pub mod roster;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod turn_order;
