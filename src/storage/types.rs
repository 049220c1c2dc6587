use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::vector::VectorClock;

/// The (clock, key) pair a client carries to preserve happens-before across
/// reads and writes. `key` names the key whose version the client most
/// recently observed under this context; empty when it has no history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalContext {
    pub clock: VectorClock,
    pub key: String,
}

/// One stored version of a key.
///
/// Versions are immutable once inserted, except that a removal rewrites the
/// `depends` of anything chained onto the removed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Wall-clock creation instant at the originating replica. Only used to
    /// resolve causally unrelated siblings during compaction.
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    pub clock: VectorClock,
    pub depends: CausalContext,
    pub available: bool,
    pub data: String,
}

impl Version {
    /// A fresh version carrying only its payload; clock and dependency are
    /// filled in by the store on insert.
    pub fn new(data: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            clock: VectorClock::new(),
            depends: CausalContext::default(),
            available: false,
            data: data.into(),
        }
    }
}

/// Outcome of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetStatus {
    /// A version equal to or containing the caller's history was served.
    Found,
    /// Only a version older than the caller's history was present.
    Old,
    /// Only versions causally unrelated to the caller were present.
    Diverged,
    /// No readable version exists for the key.
    NotFound,
    /// The causal payload was missing or undecodable.
    Err,
}

/// Outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// The key held no versions before this write.
    Added,
    /// The write joined an existing version list.
    Replaced,
    /// The causal payload was missing or undecodable.
    Err,
}
