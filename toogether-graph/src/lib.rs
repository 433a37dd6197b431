//! Relationship graph for Toogether: who can see whom, who liked whom, who
//! matched, who blocked whom, and the password recovery code flow.
//!
//! Everything here runs against a [`GraphStore`]; the API crate supplies the
//! Postgres implementation and tests use [`MemoryStore`].

pub mod blocks;
pub mod counters;
pub mod geo;
pub mod groups;
pub mod matching;
pub mod models;
pub mod ports;
pub mod profiles;
pub mod recovery;
pub mod store;

#[cfg(test)]
mod testing;

pub use store::{memory::MemoryStore, GraphStore};
