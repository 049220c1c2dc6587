use std::collections::BTreeSet;
use std::sync::RwLock;

use super::types::Endpoint;

/// The membership set at this replica, with a distinguished self endpoint.
///
/// A single reader-writer lock guards the set. Callers that need to iterate
/// take a snapshot first so the lock is never held across I/O.
pub struct View {
    nodes: RwLock<BTreeSet<Endpoint>>,
    self_endpoint: Endpoint,
}

impl View {
    /// Builds a view from a comma-separated endpoint list and the endpoint
    /// this replica answers on. Empty list entries are skipped.
    pub fn new(view_csv: &str, self_ip_port: &str) -> Self {
        let mut nodes = BTreeSet::new();
        for entry in view_csv.split(',') {
            let entry = entry.trim();
            if !entry.is_empty() {
                nodes.insert(Endpoint::parse(entry));
            }
        }

        Self {
            nodes: RwLock::new(nodes),
            self_endpoint: Endpoint::parse(self_ip_port),
        }
    }

    pub fn self_endpoint(&self) -> &Endpoint {
        &self.self_endpoint
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full-equality membership test.
    pub fn exists(&self, endpoint: &Endpoint) -> bool {
        self.nodes.read().unwrap().contains(endpoint)
    }

    /// Host-only membership test, for recognizing a peer replica regardless
    /// of its ephemeral source port.
    pub fn exists_host(&self, endpoint: &Endpoint) -> bool {
        self.nodes
            .read()
            .unwrap()
            .iter()
            .any(|node| node.same_host(endpoint))
    }

    /// Adds an endpoint. Returns false when it was already present.
    pub fn add(&self, endpoint: Endpoint) -> bool {
        self.nodes.write().unwrap().insert(endpoint)
    }

    /// Removes an endpoint. Returns false when it was absent.
    pub fn remove(&self, endpoint: &Endpoint) -> bool {
        self.nodes.write().unwrap().remove(endpoint)
    }

    /// A copy of the membership in total order.
    pub fn snapshot(&self) -> Vec<Endpoint> {
        self.nodes.read().unwrap().iter().cloned().collect()
    }

    /// Comma-separated rendering for the wire.
    pub fn to_csv(&self) -> String {
        self.snapshot()
            .iter()
            .map(Endpoint::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
