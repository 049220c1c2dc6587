//! Vector Clock Module
//!
//! Implements the partial order over replica identifiers that the rest of the
//! system is built on.
//!
//! ## Core Concepts
//! - **Coordinates**: Each shard owns one coordinate of the clock; a write
//!   advances exactly the writer's coordinate.
//! - **Comparison**: Two clocks relate as `Equal`, `Larger`, `Smaller`, or
//!   `Uncomparable`. The last one is what makes the order partial: concurrent
//!   writers produce clocks neither of which contains the other's history.

pub mod vector;
