//! View API Handlers
//!
//! HTTP endpoints that expose and mutate the membership view. Every accepted
//! change rebuilds the shard partitioning, and client-originated changes are
//! re-broadcast so the rest of the cluster converges on the same view.

use axum::extract::{ConnectInfo, Extension};
use axum::http::StatusCode;
use axum::Json;
use reqwest::Method;
use std::net::SocketAddr;
use std::sync::Arc;

use super::broadcast::Broadcaster;
use super::types::{Endpoint, IpPortForm};
use super::view::View;
use crate::shard::topology::{SharedShards, Shards};
use crate::storage::protocol::MethodReply;

/// GET `/view`: the comma-separated membership list.
pub async fn handle_view_get(
    Extension(view): Extension<Arc<View>>,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("GET /view");

    (
        StatusCode::OK,
        Json(MethodReply {
            view: Some(view.to_csv()),
            ..Default::default()
        }),
    )
}

/// PUT `/view`: add an endpoint to the view.
pub async fn handle_view_put(
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(broadcaster): Extension<Broadcaster>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("PUT /view from {}", remote);

    let form: IpPortForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let endpoint = Endpoint::parse(&form.ip_port);

    if view.exists(&endpoint) {
        return (
            StatusCode::NOT_FOUND,
            Json(error_reply(format!("{} is already in view", form.ip_port))),
        );
    }

    view.add(endpoint.clone());
    rebuild_shards(&view, &shards).await;

    // Re-broadcast only when the change came from a client; a peer's
    // broadcast has already reached everyone.
    if !view.exists_host(&Endpoint::from_addr(&remote)) {
        let targets = view.snapshot();
        broadcaster
            .broadcast(
                &targets,
                view.self_endpoint(),
                "/view",
                Method::PUT,
                &format!("ip_port={}", endpoint),
                false,
            )
            .await;
    }

    (
        StatusCode::OK,
        Json(success_reply(format!(
            "Successfully added {} to view",
            form.ip_port
        ))),
    )
}

/// DELETE `/view`: remove an endpoint from the view.
pub async fn handle_view_delete(
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(broadcaster): Extension<Broadcaster>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    body: String,
) -> (StatusCode, Json<MethodReply>) {
    tracing::info!("DELETE /view from {}", remote);

    let form: IpPortForm = serde_urlencoded::from_str(&body).unwrap_or_default();
    let endpoint = Endpoint::parse(&form.ip_port);

    if !view.exists(&endpoint) {
        return (
            StatusCode::NOT_FOUND,
            Json(error_reply(format!(
                "{} is not in current view",
                form.ip_port
            ))),
        );
    }

    view.remove(&endpoint);
    rebuild_shards(&view, &shards).await;

    if !view.exists_host(&Endpoint::from_addr(&remote)) {
        let targets = view.snapshot();
        broadcaster
            .broadcast(
                &targets,
                view.self_endpoint(),
                "/view",
                Method::DELETE,
                &format!("ip_port={}", endpoint),
                false,
            )
            .await;
    }

    (
        StatusCode::OK,
        Json(success_reply(format!(
            "Successfully removed {} from view",
            form.ip_port
        ))),
    )
}

/// Recomputes the partitioning over the changed view, keeping the current
/// shard count.
async fn rebuild_shards(view: &View, shards: &SharedShards) {
    let mut guard = shards.write().await;
    let count = guard.len();
    *guard = Shards::new(&view.snapshot(), count);
}

fn success_reply(msg: String) -> MethodReply {
    MethodReply {
        result: Some("Success".to_string()),
        msg: Some(msg),
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
