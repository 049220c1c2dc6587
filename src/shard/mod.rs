//! Shard Topology Module
//!
//! Partitions the membership view into numbered replica groups.
//!
//! ## Mechanism
//! - **Distribution**: Members are dealt into `N` groups by consuming the view
//!   in total order, remainder members going to the lowest-numbered shards.
//! - **Repair**: A shard of exactly one replica cannot tolerate any failure,
//!   so lone shards are merged into a neighbor whenever the view has at least
//!   two members. Slight size skew is the price of never stranding a replica.
//! - **Identity**: Shard ids are dense from zero and double as the vector
//!   clock coordinates replicas write under.

pub mod handlers;
pub mod topology;
