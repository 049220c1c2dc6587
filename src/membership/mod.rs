//! Membership & Topology Module
//!
//! Tracks which replicas belong to the cluster and keeps that knowledge alive.
//!
//! ## Core Mechanisms
//! - **View**: The full membership set at this replica, with a distinguished
//!   self endpoint. Mutations arrive over the `/view` HTTP endpoints and are
//!   re-broadcast so the whole cluster converges.
//! - **Gossip**: A periodic repair loop. Each replica pushes every endpoint it
//!   knows to its shard peers, so members dropped by a race reappear.
//!   Membership is eventually consistent, never authoritative.
//! - **Broadcast**: Snapshot-driven fan-out of an HTTP request to a set of
//!   peers. Best effort: one attempt, short timeout, failures logged and
//!   dropped.

pub mod broadcast;
pub mod gossip;
pub mod handlers;
pub mod types;
pub mod view;
