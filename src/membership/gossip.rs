use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;

use super::broadcast::Broadcaster;
use super::view::View;
use crate::shard::topology::SharedShards;

/// Periodic view repair.
///
/// On each tick the replica pushes every endpoint in its full view to the
/// members of its own shard as `PUT /view`. This only ever re-adds members,
/// so an endpoint removed elsewhere can race back in; that is accepted
/// behavior, membership converges eventually rather than monotonically.
pub async fn run(
    view: Arc<View>,
    shards: SharedShards,
    broadcaster: Broadcaster,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let peers = {
            let guard = shards.read().await;
            guard
                .get_shard(view.self_endpoint(), true)
                .map(|shard| shard.members.clone())
        };
        let Some(peers) = peers else {
            tracing::debug!("Gossip skipped; self is not assigned to any shard");
            continue;
        };

        for endpoint in view.snapshot() {
            let body = format!("ip_port={}", endpoint);
            broadcaster
                .broadcast(
                    &peers,
                    view.self_endpoint(),
                    "/view",
                    Method::PUT,
                    &body,
                    false,
                )
                .await;
        }
    }
}
