use serde::{Deserialize, Serialize};

/// A single coordinate of a vector clock: the event count observed for one
/// replica (shard) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEntry {
    pub identifier: u32,
    pub count: u32,
}

/// Outcome of comparing two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockRelation {
    /// The causal histories could be the same.
    Equal,
    /// This clock contains the other's causal history.
    Larger,
    /// This clock is missing causal history the other has.
    Smaller,
    /// The clocks belong to unrelated histories.
    Uncomparable,
}

/// A vector clock, serialized on the wire as a list of
/// `{"identifier": .., "count": ..}` entries.
///
/// Identifiers that are absent read as zero everywhere, so an empty clock is
/// the zero of the partial order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    entries: Vec<ClockEntry>,
}

impl VectorClock {
    /// Creates an empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// The count for an identifier, zero when absent.
    pub fn get(&self, identifier: u32) -> u32 {
        self.entries
            .iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    fn position(&self, identifier: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.identifier == identifier)
    }

    /// Adds a new identifier to the clock. No-op when the identifier is
    /// already present; the bool reports whether anything was added.
    pub fn add(mut self, identifier: u32, count: u32) -> (Self, bool) {
        if self.position(identifier).is_some() {
            return (self, false);
        }
        self.entries.push(ClockEntry { identifier, count });
        (self, true)
    }

    /// Removes an identifier from the clock; the bool reports whether it
    /// was present.
    pub fn remove(mut self, identifier: u32) -> (Self, bool) {
        match self.position(identifier) {
            Some(index) => {
                self.entries.remove(index);
                (self, true)
            }
            None => (self, false),
        }
    }

    /// Advances the count for an identifier in place. An absent identifier
    /// is created at `count`, so incrementing always registers the event.
    pub fn increment(&mut self, identifier: u32, count: u32) {
        match self.position(identifier) {
            Some(index) => self.entries[index].count += count,
            None => self.entries.push(ClockEntry { identifier, count }),
        }
    }

    /// Compares this clock against another.
    ///
    /// Iterates the union of identifiers from both sides so that an
    /// identifier present on only one side still counts: `{x: 1}` is
    /// `Larger` than the empty clock.
    pub fn compare(&self, other: &VectorClock) -> ClockRelation {
        let mut first_larger = false;
        let mut second_larger = false;

        for entry in &self.entries {
            match entry.count.cmp(&other.get(entry.identifier)) {
                std::cmp::Ordering::Greater => first_larger = true,
                std::cmp::Ordering::Less => second_larger = true,
                std::cmp::Ordering::Equal => {}
            }
        }

        for entry in &other.entries {
            match self.get(entry.identifier).cmp(&entry.count) {
                std::cmp::Ordering::Greater => first_larger = true,
                std::cmp::Ordering::Less => second_larger = true,
                std::cmp::Ordering::Equal => {}
            }
        }

        match (first_larger, second_larger) {
            (true, true) => ClockRelation::Uncomparable,
            (true, false) => ClockRelation::Larger,
            (false, true) => ClockRelation::Smaller,
            (false, false) => ClockRelation::Equal,
        }
    }

    /// True when the clock carries no history (every count is zero).
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|entry| entry.count == 0)
    }

    /// The raw entries, in insertion order.
    pub fn entries(&self) -> &[ClockEntry] {
        &self.entries
    }
}
