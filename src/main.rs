use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::RwLock;

use causal_cluster::membership::broadcast::Broadcaster;
use causal_cluster::membership::gossip;
use causal_cluster::membership::handlers::{
    handle_view_delete, handle_view_get, handle_view_put,
};
use causal_cluster::membership::view::View;
use causal_cluster::shard::handlers::{
    handle_all_ids, handle_change_shard_number, handle_count, handle_members, handle_my_id,
};
use causal_cluster::shard::topology::{SharedShards, Shards};
use causal_cluster::storage::causal::CausalStore;
use causal_cluster::storage::handlers::{
    handle_kv_delete, handle_kv_get, handle_kv_put, handle_kv_search,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let view_env = std::env::var("VIEW").unwrap_or_default();
    let ip_port_env = std::env::var("IP_PORT").unwrap_or_default();
    let shard_env = std::env::var("S")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let gossip_secs = std::env::var("GOSSIP")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(4);
    let gc_millis = std::env::var("GC")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&millis| millis > 0)
        .unwrap_or(1000);
    let max_body_bytes = std::env::var("MAX_BODY_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(4 * 1024 * 1024);

    if ip_port_env.is_empty() {
        anyhow::bail!("IP_PORT must be set to this replica's host:port");
    }

    tracing::info!("View environment  : {}", view_env);
    tracing::info!("IpPort environment: {}", ip_port_env);
    tracing::info!("Shard environment : {}", shard_env);
    tracing::info!("Gossip environment: {}s", gossip_secs);

    // 1. Topology:
    let view = Arc::new(View::new(&view_env, &ip_port_env));
    let shards: SharedShards = Arc::new(RwLock::new(Shards::new(&view.snapshot(), shard_env)));
    tracing::info!(
        "Partitioned {} members into {} shard(s)",
        view.len(),
        shards.read().await.len()
    );

    // 2. Storage layer:
    let store = Arc::new(CausalStore::new());
    store.start_compaction(Duration::from_millis(gc_millis));

    // 3. Gossip repair loop:
    let broadcaster = Broadcaster::new();
    tokio::spawn(gossip::run(
        view.clone(),
        shards.clone(),
        broadcaster.clone(),
        Duration::from_secs(gossip_secs),
    ));

    // 4. HTTP router:
    let app = Router::new()
        .route("/health/routes", get(handle_routes))
        .route("/health/stats", get(handle_stats))
        .route("/keyValue-store/search/:key", get(handle_kv_search))
        .route(
            "/keyValue-store/:key",
            get(handle_kv_get).put(handle_kv_put).delete(handle_kv_delete),
        )
        .route(
            "/view",
            get(handle_view_get)
                .put(handle_view_put)
                .delete(handle_view_delete),
        )
        .route("/shard/my_id", get(handle_my_id))
        .route("/shard/all_ids", get(handle_all_ids))
        .route("/shard/members/:id", get(handle_members))
        .route("/shard/count/:id", get(handle_count))
        .route("/shard/changeShardNumber", put(handle_change_shard_number))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(view.clone()))
        .layer(Extension(shards.clone()))
        .layer(Extension(store.clone()))
        .layer(Extension(broadcaster.clone()));

    // 5. Serve:
    let addr: SocketAddr = ip_port_env.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[derive(Serialize)]
struct RoutesResponse {
    routes: Vec<&'static str>,
}

#[derive(Serialize)]
struct NodeStatsResponse {
    self_endpoint: String,
    view: String,
    view_size: usize,
    shard_count: usize,
    my_shard_id: Option<u32>,
    keys: usize,
    versions: usize,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

async fn handle_routes() -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: vec![
            "/health/routes",
            "/health/stats",
            "/keyValue-store/:key",
            "/keyValue-store/search/:key",
            "/view",
            "/shard/my_id",
            "/shard/all_ids",
            "/shard/members/:id",
            "/shard/count/:id",
            "/shard/changeShardNumber",
        ],
    })
}

async fn handle_stats(
    Extension(view): Extension<Arc<View>>,
    Extension(shards): Extension<SharedShards>,
    Extension(store): Extension<Arc<CausalStore>>,
) -> Json<NodeStatsResponse> {
    let (shard_count, my_shard_id) = {
        let guard = shards.read().await;
        (
            guard.len(),
            guard
                .get_shard(view.self_endpoint(), true)
                .map(|shard| shard.id),
        )
    };

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        self_endpoint: view.self_endpoint().to_string(),
        view: view.to_csv(),
        view_size: view.len(),
        shard_count,
        my_shard_id,
        keys: store.key_count(),
        versions: store.version_count(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
