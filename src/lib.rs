//! Causally Consistent Key-Value Cluster Library
//!
//! This library crate defines the core modules that make up the replicated store.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`clock`**: The partial-order primitive. Vector clocks over replica (shard)
//!   identifiers are what every causal decision in the system reduces to.
//! - **`membership`**: The cluster topology layer. Tracks the view (the full
//!   membership set), fans out mutations to peers, and runs the gossip loop that
//!   heals views which have drifted apart.
//! - **`shard`**: Deterministic partitioning of the view into numbered replica
//!   groups. A replica writes under its shard's coordinate of the vector clock.
//! - **`storage`**: The causal state layer. A multi-version key-value store that
//!   tracks write dependencies, filters reads by availability, and compacts
//!   version siblings in the background.

pub mod clock;
pub mod membership;
pub mod shard;
pub mod storage;
