//! KV API Handlers
//!
//! The request router for `/keyValue-store/*`. Handlers normalize what came
//! off the wire (client form bodies vs. peer JSON bodies, payload quoting,
//! missing contexts), then drive the causal store and fan successful client
//! mutations out to the rest of the view.
//!
//! Sender classification: a request whose source host resolves to a shard is
//! a peer replica and is trusted to carry a `ReplicaTransmit`; anything else
//! is a client.

use axum::extract::{ConnectInfo, Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use reqwest::Method;
use std::net::SocketAddr;
use std::sync::Arc;

use super::causal::CausalStore;
use super::protocol::{clean_payload, MethodReply, PayloadForm, PutForm, ReplicaTransmit};
use super::types::{CausalContext, GetStatus, PutStatus, Version};
use crate::clock::vector::VectorClock;
use crate::membership::broadcast::Broadcaster;
use crate::membership::types::Endpoint;
use crate::membership::view::View;
use crate::shard::topology::SharedShards;

const MAX_VALUE_BYTES: usize = 1024 * 1024;
const MAX_KEY_LEN: usize = 200;

/// GET `/keyValue-store/<key>`.
pub async fn handle_kv_get(
    Extension(store): Extension<Arc<CausalStore>>,
    Path(key): Path<String>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    if !key_valid(&key) {
        return invalid_key_reply();
    }

    let form: PayloadForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let payload = clean_payload(&form.payload);
    tracing::info!("GET /keyValue-store/{} payload={}", key, payload);

    let (reply, status) = get_kv(&store, &key, &payload);
    (status, Json(reply))
}

/// PUT `/keyValue-store/<key>`.
pub async fn handle_kv_put(
    Extension(store): Extension<Arc<CausalStore>>,
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(broadcaster): Extension<Broadcaster>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Path(key): Path<String>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    if !key_valid(&key) {
        return invalid_key_reply();
    }

    let sender = Endpoint::from_addr(&remote);
    let peer_shard = {
        let guard = shards.read().await;
        guard.get_shard(&sender, false).map(|shard| shard.id)
    };

    let (data, timestamp, mut payload, writer_id) = match peer_shard {
        Some(shard_id) => {
            // Peer replicas transmit the full stored version.
            let Ok(transmit) = serde_json::from_str::<ReplicaTransmit>(&body) else {
                return internal_error_reply();
            };
            let Some(value) = transmit.value else {
                return internal_error_reply();
            };
            (value.data, value.timestamp, transmit.payload, shard_id)
        }
        None => {
            let my_shard = {
                let guard = shards.read().await;
                guard
                    .get_shard(view.self_endpoint(), true)
                    .map(|shard| shard.id)
            };
            let Some(shard_id) = my_shard else {
                return internal_error_reply();
            };

            let form: PutForm = serde_urlencoded::from_str(&body).unwrap_or_default();
            (form.val, Utc::now(), clean_payload(&form.payload), shard_id)
        }
    };
    tracing::info!(
        "PUT /keyValue-store/{} from {} (peer shard {:?}) payload={}",
        key,
        remote,
        peer_shard,
        payload
    );

    // A client with no history gets a zero context declaring every shard.
    if payload.is_empty() {
        let mut clock = VectorClock::new();
        {
            let guard = shards.read().await;
            for shard in guard.iter() {
                let (next, _) = clock.add(shard.id, 0);
                clock = next;
            }
        }
        payload = serde_json::to_string(&CausalContext {
            clock,
            key: String::new(),
        })
        .unwrap_or_default();
    }

    let (value, reply, status) = put_kv(&store, &key, data, timestamp, &payload, writer_id);

    if peer_shard.is_none() && status.is_success() {
        if let Some(stored) = value {
            let transmit = ReplicaTransmit {
                value: Some(stored),
                payload: payload.clone(),
            };
            let body = serde_json::to_string(&transmit).unwrap_or_default();
            let targets = view.snapshot();
            broadcaster
                .broadcast(
                    &targets,
                    view.self_endpoint(),
                    &format!("/keyValue-store/{}", key),
                    Method::PUT,
                    &body,
                    true,
                )
                .await;
        }
    }

    (status, Json(reply))
}

/// DELETE `/keyValue-store/<key>`.
pub async fn handle_kv_delete(
    Extension(store): Extension<Arc<CausalStore>>,
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(broadcaster): Extension<Broadcaster>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Path(key): Path<String>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    if !key_valid(&key) {
        return invalid_key_reply();
    }

    let sender = Endpoint::from_addr(&remote);
    let from_peer = {
        let guard = shards.read().await;
        guard.get_shard(&sender, false).is_some()
    };

    let payload = if from_peer {
        serde_json::from_str::<ReplicaTransmit>(&body)
            .map(|transmit| transmit.payload)
            .unwrap_or_default()
    } else {
        let form: PayloadForm = serde_urlencoded::from_str(&body).unwrap_or_default();
        clean_payload(&form.payload)
    };
    tracing::info!(
        "DELETE /keyValue-store/{} from {} (peer: {}) payload={}",
        key,
        remote,
        from_peer,
        payload
    );

    let (reply, status) = delete_kv(&store, &key, &payload);

    if !from_peer && status == StatusCode::OK {
        let transmit = ReplicaTransmit {
            value: None,
            payload: payload.clone(),
        };
        let body = serde_json::to_string(&transmit).unwrap_or_default();
        let targets = view.snapshot();
        broadcaster
            .broadcast(
                &targets,
                view.self_endpoint(),
                &format!("/keyValue-store/{}", key),
                Method::DELETE,
                &body,
                true,
            )
            .await;
    }

    (status, Json(reply))
}

/// GET `/keyValue-store/search/<key>`: existence check, piggybacked on the
/// read path. Always replies 200; the verdict is the `isExists` field.
pub async fn handle_kv_search(
    Extension(store): Extension<Arc<CausalStore>>,
    Path(key): Path<String>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    if !key_valid(&key) {
        return invalid_key_reply();
    }

    let form: PayloadForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let payload = clean_payload(&form.payload);
    tracing::info!("GET /keyValue-store/search/{} payload={}", key, payload);

    let (inner, status) = get_kv(&store, &key, &payload);
    let reply = if status == StatusCode::OK {
        MethodReply {
            owner: Some(0),
            is_exists: Some(true),
            result: Some("Success".to_string()),
            payload: inner.payload,
            ..Default::default()
        }
    } else {
        MethodReply {
            is_exists: Some(false),
            result: Some("Success".to_string()),
            payload: inner.payload,
            ..Default::default()
        }
    };

    (StatusCode::OK, Json(reply))
}

fn get_kv(store: &CausalStore, key: &str, payload: &str) -> (MethodReply, StatusCode) {
    if payload.is_empty() {
        return (
            error_reply("Key does not exist", payload),
            StatusCode::NOT_FOUND,
        );
    }

    let (value, echo, status) = store.get(key, payload.as_bytes());
    match status {
        GetStatus::Err => (
            error_reply("Unable to decode causal payload", payload),
            StatusCode::FORBIDDEN,
        ),
        GetStatus::NotFound => (
            error_reply("Key does not exist", payload),
            StatusCode::NOT_FOUND,
        ),
        GetStatus::Diverged => (
            error_reply("Value is not causally related", payload),
            StatusCode::CONFLICT,
        ),
        GetStatus::Found | GetStatus::Old => {
            let value = value.map(|version| version.data).unwrap_or_default();
            (
                MethodReply {
                    result: Some("Success".to_string()),
                    value: Some(value),
                    payload: Some(echo),
                    ..Default::default()
                },
                StatusCode::OK,
            )
        }
    }
}

fn put_kv(
    store: &CausalStore,
    key: &str,
    data: String,
    timestamp: chrono::DateTime<Utc>,
    payload: &str,
    writer_id: u32,
) -> (Option<Version>, MethodReply, StatusCode) {
    if payload.is_empty() {
        return (
            None,
            error_reply("Payload missing", payload),
            StatusCode::UNAUTHORIZED,
        );
    }
    if data.is_empty() {
        return (
            None,
            value_error_reply("Value is missing"),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }
    if data.len() > MAX_VALUE_BYTES {
        return (
            None,
            value_error_reply("Object too large. Size limit is 1MB"),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }

    let (value, echo, status) = store.put(
        key,
        Version::new(data, timestamp),
        payload.as_bytes(),
        writer_id,
    );
    match status {
        PutStatus::Err => (
            None,
            error_reply("Unable to decode causal payload", payload),
            StatusCode::FORBIDDEN,
        ),
        PutStatus::Added => (
            value,
            MethodReply {
                replaced: Some(false),
                msg: Some("Added successfully".to_string()),
                payload: Some(echo),
                ..Default::default()
            },
            StatusCode::CREATED,
        ),
        PutStatus::Replaced => (
            value,
            MethodReply {
                replaced: Some(true),
                msg: Some("Updated successfully".to_string()),
                payload: Some(echo),
                ..Default::default()
            },
            StatusCode::OK,
        ),
    }
}

fn delete_kv(store: &CausalStore, key: &str, payload: &str) -> (MethodReply, StatusCode) {
    if payload.is_empty() {
        return (
            error_reply("Key does not exist", payload),
            StatusCode::NOT_FOUND,
        );
    }

    if store.delete(key, payload.as_bytes()) {
        (
            MethodReply {
                result: Some("Success".to_string()),
                msg: Some("Key deleted".to_string()),
                payload: Some(payload.to_string()),
                ..Default::default()
            },
            StatusCode::OK,
        )
    } else {
        (
            error_reply("Key does not exist", payload),
            StatusCode::NOT_FOUND,
        )
    }
}

fn key_valid(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_LEN
}

fn invalid_key_reply() -> (StatusCode, Json<MethodReply>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(MethodReply {
            msg: Some("Error".to_string()),
            error: Some("Key not valid".to_string()),
            ..Default::default()
        }),
    )
}

fn internal_error_reply() -> (StatusCode, Json<MethodReply>) {
    (
        StatusCode::FORBIDDEN,
        Json(MethodReply {
            result: Some("Error".to_string()),
            msg: Some("Internal error".to_string()),
            ..Default::default()
        }),
    )
}

fn error_reply(msg: &str, payload: &str) -> MethodReply {
    MethodReply {
        result: Some("Error".to_string()),
        msg: Some(msg.to_string()),
        payload: Some(payload.to_string()),
        ..Default::default()
    }
}

fn value_error_reply(error: &str) -> MethodReply {
    MethodReply {
        msg: Some("Error".to_string()),
        error: Some(error.to_string()),
        ..Default::default()
    }
}
