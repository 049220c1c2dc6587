//! Causal Storage Module
//!
//! Implements the multi-version key-value store that carries the causal
//! consistency guarantees.
//!
//! ## Core Concepts
//! - **Versions**: Every write appends a version stamped with its vector
//!   clock and the causal context it was written under. Concurrent writers
//!   coexist as siblings until compaction resolves them.
//! - **Availability**: A version is readable only while the version it
//!   depends on is itself present and readable, so a replica never serves a
//!   value whose causal history it has not yet received.
//! - **Compaction**: A background pass collapses each key to a single
//!   version, preferring causal dominance and falling back to wall-clock
//!   recency for unrelated siblings. Dependencies of removed versions are
//!   rewritten, never orphaned.

pub mod causal;
pub mod handlers;
pub mod protocol;
pub mod types;

#[cfg(test)]
mod tests;
