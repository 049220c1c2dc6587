use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use dashmap::DashMap;

use super::types::{CausalContext, GetStatus, PutStatus, Version};
use crate::clock::vector::{ClockRelation, VectorClock};

/// The version list of one key behind its own reader-writer lock.
type Bucket = Arc<RwLock<Vec<Version>>>;

/// A vector clock flattened to a hashable, order-independent form, used to
/// detect dependency cycles during the availability walk.
type ClockPrint = Vec<(u32, u32)>;

/// Bucket indices grouped by how each version's clock relates to a
/// reference clock. Insertion order is preserved within each group.
#[derive(Debug, Default)]
struct Classified {
    equal: Vec<usize>,
    larger: Vec<usize>,
    smaller: Vec<usize>,
    uncomparable: Vec<usize>,
}

/// Multi-version key-value store with causal dependency tracking.
///
/// Buckets are created lazily on first write and live for the process
/// lifetime. Reads hold a key's read lock only long enough to snapshot the
/// bucket; writes hold the write lock for the append. Removal is the one
/// multi-lock operation: it may take one other key's write lock to rewrite
/// dependencies, so every removal path first takes the store-wide rewrite
/// mutex, keeping at most one such operation in flight.
pub struct CausalStore {
    buckets: DashMap<String, Bucket>,
    rewrite_guard: Mutex<()>,
    gc_in_use: AtomicBool,
}

impl CausalStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            rewrite_guard: Mutex::new(()),
            gc_in_use: AtomicBool::new(false),
        }
    }

    /// Spawns the background compaction ticker.
    pub fn start_compaction(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.garbage_collect();
            }
        });
    }

    fn bucket(&self, key: &str) -> Option<Bucket> {
        self.buckets.get(key).map(|entry| entry.value().clone())
    }

    /// Number of keys that have ever been written.
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total stored versions across all keys.
    pub fn version_count(&self) -> usize {
        self.buckets
            .iter()
            .map(|entry| entry.value().read().unwrap().len())
            .sum()
    }

    /// Whether a version's declared dependency is currently satisfiable.
    ///
    /// True when the version is already marked available, when it depends on
    /// nothing (all-zero clock), or when the key it depends on holds a
    /// version with the exact dependency clock that is itself available,
    /// checked transitively.
    pub fn is_available(&self, version: &Version) -> bool {
        let mut visiting = HashSet::new();
        self.available_inner(version, "", &[], &mut visiting)
    }

    fn version_available(&self, version: &Version, held_key: &str, held: &[Version]) -> bool {
        let mut visiting = HashSet::new();
        self.available_inner(version, held_key, held, &mut visiting)
    }

    fn available_inner(
        &self,
        version: &Version,
        held_key: &str,
        held: &[Version],
        visiting: &mut HashSet<(String, ClockPrint)>,
    ) -> bool {
        if version.available || version.depends.clock.is_zero() {
            return true;
        }

        let dep_key = version.depends.key.clone();
        if !visiting.insert((dep_key.clone(), clock_print(&version.depends.clock))) {
            // Dependency cycle; nothing on it can ever become available.
            return false;
        }

        if dep_key == held_key {
            return held.iter().any(|candidate| {
                candidate.clock.compare(&version.depends.clock) == ClockRelation::Equal
                    && self.available_inner(candidate, held_key, held, visiting)
            });
        }

        let Some(bucket) = self.bucket(&dep_key) else {
            return false;
        };
        // Snapshot, then release, so the walk never holds a second lock.
        let candidates: Vec<Version> = bucket.read().unwrap().clone();
        candidates.iter().any(|candidate| {
            candidate.clock.compare(&version.depends.clock) == ClockRelation::Equal
                && self.available_inner(candidate, held_key, held, visiting)
        })
    }

    /// Groups `versions` by their relation to `clock`, optionally dropping
    /// versions whose dependencies are not currently satisfiable.
    fn classify(
        &self,
        key: &str,
        versions: &[Version],
        clock: &VectorClock,
        only_available: bool,
    ) -> Classified {
        let mut classified = Classified::default();

        for (index, version) in versions.iter().enumerate() {
            if only_available && !self.version_available(version, key, versions) {
                continue;
            }
            match version.clock.compare(clock) {
                ClockRelation::Equal => classified.equal.push(index),
                ClockRelation::Larger => classified.larger.push(index),
                ClockRelation::Smaller => classified.smaller.push(index),
                ClockRelation::Uncomparable => classified.uncomparable.push(index),
            }
        }

        classified
    }

    /// Reads the version best matching the caller's causal context.
    ///
    /// Preference order is Equal, Larger (both `Found`), Smaller (`Old`),
    /// Uncomparable (`Diverged`); the first version of the chosen group is
    /// served and its clock echoed back as the caller's next context.
    pub fn get(&self, key: &str, payload: &[u8]) -> (Option<Version>, String, GetStatus) {
        let Some(context) = decode_context(payload) else {
            return (None, String::new(), GetStatus::Err);
        };
        let Some(bucket) = self.bucket(key) else {
            return (None, String::new(), GetStatus::NotFound);
        };

        // Classify over a snapshot so no bucket lock is held during the
        // availability walk.
        let versions: Vec<Version> = bucket.read().unwrap().clone();
        let classified = self.classify(key, &versions, &context.clock, true);

        let picked = classified
            .equal
            .first()
            .map(|&index| (index, GetStatus::Found))
            .or_else(|| {
                classified
                    .larger
                    .first()
                    .map(|&index| (index, GetStatus::Found))
            })
            .or_else(|| {
                classified
                    .smaller
                    .first()
                    .map(|&index| (index, GetStatus::Old))
            })
            .or_else(|| {
                classified
                    .uncomparable
                    .first()
                    .map(|&index| (index, GetStatus::Diverged))
            });

        let Some((index, status)) = picked else {
            return (None, String::new(), GetStatus::NotFound);
        };

        let version = versions[index].clone();
        let echo = encode_context(&CausalContext {
            clock: version.clock.clone(),
            key: key.to_string(),
        });
        (Some(version), echo, status)
    }

    /// Appends a new version for the key.
    ///
    /// The stored clock is the caller's context clock advanced by one at the
    /// writer's coordinate; the context itself becomes the version's
    /// dependency. Siblings are never removed here, compaction resolves them
    /// asynchronously.
    pub fn put(
        &self,
        key: &str,
        mut value: Version,
        payload: &[u8],
        writer_id: u32,
    ) -> (Option<Version>, String, PutStatus) {
        let Some(context) = decode_context(payload) else {
            return (None, String::new(), PutStatus::Err);
        };

        value.clock = context.clock.clone();
        value.clock.increment(writer_id, 1);
        value.depends = context;
        value.available = self.is_available(&value);

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .value()
            .clone();

        let status = {
            let mut versions = bucket.write().unwrap();
            let status = if versions.is_empty() {
                PutStatus::Added
            } else {
                PutStatus::Replaced
            };
            versions.push(value.clone());
            status
        };

        let echo = encode_context(&CausalContext {
            clock: value.clock.clone(),
            key: key.to_string(),
        });
        (Some(value), echo, status)
    }

    /// Removes every version whose clock equals or precedes the caller's
    /// context clock. Larger and Uncomparable siblings survive: they are
    /// future or concurrent history this tombstone cannot suppress.
    pub fn delete(&self, key: &str, payload: &[u8]) -> bool {
        let Some(context) = decode_context(payload) else {
            return false;
        };
        let Some(bucket) = self.bucket(key) else {
            return false;
        };

        let _rewrites = self.rewrite_guard.lock().unwrap();
        let mut versions = bucket.write().unwrap();

        let classified = self.classify(key, versions.as_slice(), &context.clock, false);
        let mut doomed: Vec<usize> = classified
            .equal
            .iter()
            .chain(classified.smaller.iter())
            .copied()
            .collect();

        // Highest index first so the remaining indices stay valid.
        doomed.sort_unstable();
        for &index in doomed.iter().rev() {
            self.delete_version(key, &mut versions, index);
        }

        true
    }

    /// Removes one version, rewiring anything chained onto it first.
    ///
    /// Every version in the store whose dependency is exactly
    /// `{pivot.clock, key}` is repointed at the pivot's own dependency, so
    /// its availability is unchanged by the removal. Cross-key rewrites take
    /// that key's write lock; the caller's own lock is never re-acquired.
    ///
    /// Caller must hold the rewrite mutex and the pivot key's write lock.
    fn delete_version(&self, key: &str, versions: &mut Vec<Version>, index: usize) {
        let pivot_clock = versions[index].clock.clone();
        let new_depends = versions[index].depends.clone();

        for (position, version) in versions.iter_mut().enumerate() {
            if position == index {
                continue;
            }
            if version.depends.key == key
                && version.depends.clock.compare(&pivot_clock) == ClockRelation::Equal
            {
                version.depends = new_depends.clone();
            }
        }

        // Snapshot the map first; the bucket locks are taken one at a time
        // with no map reference held.
        let others: Vec<Bucket> = self
            .buckets
            .iter()
            .filter(|entry| entry.key().as_str() != key)
            .map(|entry| entry.value().clone())
            .collect();
        for bucket in others {
            let mut candidates = bucket.write().unwrap();
            for candidate in candidates.iter_mut() {
                if candidate.depends.key == key
                    && candidate.depends.clock.compare(&pivot_clock) == ClockRelation::Equal
                {
                    candidate.depends = new_depends.clone();
                }
            }
        }

        versions.remove(index);
    }

    /// Collapses every key to at most one version.
    ///
    /// Versions dominated by a sibling's clock are dropped; unrelated or
    /// equal siblings are resolved by wall-clock timestamp, older loses,
    /// ties drop the earlier-inserted one. At most one pass runs at a time.
    pub fn garbage_collect(&self) {
        if self
            .gc_in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let keys: Vec<String> = self.buckets.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            let Some(bucket) = self.bucket(&key) else {
                continue;
            };

            let _rewrites = self.rewrite_guard.lock().unwrap();
            let mut versions = bucket.write().unwrap();
            while versions.len() > 1 {
                let relation = versions[0].clock.compare(&versions[1].clock);
                let drop_index = match relation {
                    ClockRelation::Smaller => 0,
                    ClockRelation::Larger => 1,
                    _ => {
                        if versions[0].timestamp > versions[1].timestamp {
                            1
                        } else {
                            0
                        }
                    }
                };
                self.delete_version(&key, &mut versions, drop_index);
            }
            if !versions.is_empty() {
                tracing::debug!("Compacted key {} to clock {:?}", key, versions[0].clock);
            }
        }

        self.gc_in_use.store(false, Ordering::SeqCst);
    }
}

impl Default for CausalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn clock_print(clock: &VectorClock) -> ClockPrint {
    let mut print: ClockPrint = clock
        .entries()
        .iter()
        .map(|entry| (entry.identifier, entry.count))
        .collect();
    print.sort_unstable();
    print
}

fn decode_context(payload: &[u8]) -> Option<CausalContext> {
    if payload.is_empty() {
        return None;
    }
    serde_json::from_slice(payload).ok()
}

fn encode_context(context: &CausalContext) -> String {
    serde_json::to_string(context).unwrap_or_default()
}
