//! Shard API Handlers
//!
//! HTTP endpoints that expose the current partitioning and let a client
//! request a different shard count. The partition itself is always derived
//! from the view, so these handlers only ever read or rebuild, never edit.

use axum::extract::{ConnectInfo, Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use reqwest::Method;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::topology::{SharedShards, Shards};
use crate::membership::broadcast::Broadcaster;
use crate::membership::types::Endpoint;
use crate::membership::view::View;
use crate::storage::protocol::MethodReply;

/// Form body carried by `PUT /shard/changeShardNumber`.
#[derive(Debug, Default, Deserialize)]
struct ShardNumberForm {
    #[serde(default)]
    num: String,
}

/// GET `/shard/my_id`: the id of the shard this replica belongs to.
pub async fn handle_my_id(
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("GET /shard/my_id");

    let guard = shards.read().await;
    match guard.get_shard(view.self_endpoint(), true) {
        Some(shard) => (
            StatusCode::OK,
            Json(MethodReply {
                id: Some(shard.id),
                ..Default::default()
            }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(error_reply("Self is not assigned to any shard".to_string())),
        ),
    }
}

/// GET `/shard/all_ids`: comma-separated list of every shard id.
pub async fn handle_all_ids(
    Extension(shards): Extension<SharedShards>,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("GET /shard/all_ids");

    let guard = shards.read().await;
    (StatusCode::OK, Json(all_ids_reply(&guard)))
}

/// GET `/shard/members/<id>`: the members of one shard.
pub async fn handle_members(
    Extension(shards): Extension<SharedShards>,
    Path(id): Path<u32>,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("GET /shard/members/{}", id);

    let guard = shards.read().await;
    match guard.get(id) {
        Some(shard) => (
            StatusCode::OK,
            Json(MethodReply {
                members: Some(shard.members_csv()),
                ..Default::default()
            }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(error_reply(format!("No shard with id {}", id))),
        ),
    }
}

/// GET `/shard/count/<id>`: the key capacity of one shard, as the share of
/// the 32-bit key space the current shard count gives it.
pub async fn handle_count(
    Extension(shards): Extension<SharedShards>,
    Path(id): Path<u32>,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("GET /shard/count/{}", id);

    let guard = shards.read().await;
    if guard.get(id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(error_reply(format!("No shard with id {}", id))),
        );
    }

    (
        StatusCode::OK,
        Json(MethodReply {
            count: Some(u64::from(u32::MAX) / guard.len() as u64),
            ..Default::default()
        }),
    )
}

/// PUT `/shard/changeShardNumber`: repartition the view into `num` shards.
///
/// Rejected when more shards than members are requested. On success the
/// reply mirrors `/shard/all_ids` for the new partitioning.
pub async fn handle_change_shard_number(
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(broadcaster): Extension<Broadcaster>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("PUT /shard/changeShardNumber from {}", remote);

    let form: ShardNumberForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let requested = form.num.trim().parse::<usize>().unwrap_or(0);

    if requested > view.len() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_reply(format!(
                "Not enough nodes for {} shards",
                form.num
            ))),
        );
    }

    let reply = {
        let mut guard = shards.write().await;
        *guard = Shards::new(&view.snapshot(), requested);
        all_ids_reply(&guard)
    };

    if !view.exists_host(&Endpoint::from_addr(&remote)) {
        let targets = view.snapshot();
        broadcaster
            .broadcast(
                &targets,
                view.self_endpoint(),
                "/shard/changeShardNumber",
                Method::PUT,
                &format!("num={}", requested),
                false,
            )
            .await;
    }

    (StatusCode::OK, Json(reply))
}

fn all_ids_reply(shards: &Shards) -> MethodReply {
    MethodReply {
        shard_ids: Some(shards.ids_csv()),
        ..Default::default()
    }
}

fn error_reply(msg: String) -> MethodReply {
    MethodReply {
        result: Some("Error".to_string()),
        msg: Some(msg),
        ..Default::default()
    }
}
