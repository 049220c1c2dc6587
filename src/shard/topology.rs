use std::sync::Arc;

use tokio::sync::RwLock;

use crate::membership::types::Endpoint;

/// The current partitioning, swapped wholesale whenever membership or the
/// requested shard count changes. Readers that need a stable assignment hold
/// the read side across their lookup.
pub type SharedShards = Arc<RwLock<Shards>>;

/// One partition of the view.
///
/// Member lists are immutable; any change to the cluster rebuilds the whole
/// `Shards` value instead of editing a shard in place.
#[derive(Debug, Clone)]
pub struct Shard {
    pub id: u32,
    pub members: Vec<Endpoint>,
}

impl Shard {
    /// Membership test by full equality, or host-only when `match_port` is
    /// false (for classifying peers connecting from ephemeral ports).
    pub fn contains(&self, endpoint: &Endpoint, match_port: bool) -> bool {
        if match_port {
            self.members.iter().any(|member| member == endpoint)
        } else {
            self.members.iter().any(|member| member.same_host(endpoint))
        }
    }

    /// Comma-separated member rendering for the wire.
    pub fn members_csv(&self) -> String {
        self.members
            .iter()
            .map(Endpoint::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A deterministic partition of the view into disjoint shards.
#[derive(Debug, Clone, Default)]
pub struct Shards {
    shards: Vec<Shard>,
}

impl Shards {
    /// Partitions `members` (already in total order) into `num` shards.
    ///
    /// A requested count of zero means one. The base split hands
    /// `len / num` members to every shard and one extra to the first
    /// `len % num`. A repair pass then scans from the highest index down
    /// and merges any 1-member shard into its lower neighbor (or the upper
    /// one at index zero), dropping emptied slots, so no shard is left with
    /// a single replica while the view holds two or more.
    pub fn new(members: &[Endpoint], num: usize) -> Self {
        let num = if num == 0 { 1 } else { num };

        let each = members.len() / num;
        let mut extra = members.len() % num;
        let mut sizes = Vec::with_capacity(num);
        for _ in 0..num {
            sizes.push(each + usize::from(extra > 0));
            extra = extra.saturating_sub(1);
        }

        for index in (0..sizes.len()).rev() {
            if sizes[index] != 1 {
                continue;
            }
            if index == 0 {
                if sizes.len() > 1 {
                    sizes[1] += 1;
                    sizes[0] = 0;
                }
            } else {
                sizes[index - 1] += 1;
                sizes[index] = 0;
            }
        }
        sizes.retain(|&size| size != 0);

        let mut shards = Vec::with_capacity(sizes.len());
        let mut cursor = 0;
        for (id, &size) in sizes.iter().enumerate() {
            shards.push(Shard {
                id: id as u32,
                members: members[cursor..cursor + size].to_vec(),
            });
            cursor += size;
        }

        Self { shards }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter()
    }

    /// The shard with the given id, if any. Ids are dense, so this is an
    /// index lookup.
    pub fn get(&self, id: u32) -> Option<&Shard> {
        self.shards.get(id as usize)
    }

    /// The shard containing an endpoint, by full or host-only equality.
    pub fn get_shard(&self, endpoint: &Endpoint, match_port: bool) -> Option<&Shard> {
        self.shards
            .iter()
            .find(|shard| shard.contains(endpoint, match_port))
    }

    /// Comma-separated shard id list for the wire.
    pub fn ids_csv(&self) -> String {
        self.shards
            .iter()
            .map(|shard| shard.id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
