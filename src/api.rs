//! Health & Status API endpoints
//!
//! Provides HTTP endpoints for monitoring and status:
//! - GET /health - Simple health check
//! - GET /metrics - Prometheus metrics
//! - GET /status - Queue counts per asset kind, uptime, price table

#![allow(dead_code)]

use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use crate::db;
use crate::metrics;
use crate::types::{AssetKind, BridgeStatus, DeployStatus};

/// Server start time for uptime calculation
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Status response
#[derive(Serialize)]
struct StatusResponse {
    status: String,
    uptime_seconds: u64,
    deployments: KindQueues,
    bridges: KindQueues,
    price_quotes: usize,
}

#[derive(Serialize)]
struct KindQueues {
    token: QueueStatus,
    nft: QueueStatus,
}

#[derive(Serialize, Default)]
struct QueueStatus {
    pending: i64,
    in_progress: i64,
    completed: i64,
    errored: i64,
}

/// Start the API server (combines metrics and status endpoints)
pub async fn start_api_server(addr: SocketAddr, db: PgPool) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server started");

    START_TIME.get_or_init(Instant::now);

    // Mark relayer as up
    metrics::UP.set(1.0);

    loop {
        let (mut socket, _) = listener.accept().await?;
        let db = db.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            if socket.readable().await.is_ok() {
                let _ = socket.try_read(&mut buf);
            }

            let request = String::from_utf8_lossy(&buf);

            if request.contains("GET /metrics") {
                // Prometheus metrics
                let encoder = TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut buffer = Vec::new();
                let _ = encoder.encode(&metric_families, &mut buffer);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n",
                    buffer.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&buffer).await;
            } else if request.contains("GET /health") {
                let response =
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
                let _ = socket.write_all(response.as_bytes()).await;
            } else if request.contains("GET /status") {
                let status = build_status_response(&db).await;
                let body = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            } else {
                let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
    }
}

async fn build_status_response(db: &PgPool) -> StatusResponse {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    StatusResponse {
        status: "ok".to_string(),
        uptime_seconds: uptime,
        deployments: KindQueues {
            token: deployment_queues(db, AssetKind::Token).await,
            nft: deployment_queues(db, AssetKind::Nft).await,
        },
        bridges: KindQueues {
            token: bridge_queues(db, AssetKind::Token).await,
            nft: bridge_queues(db, AssetKind::Nft).await,
        },
        price_quotes: db::get_price_quotes(db).await.map(|q| q.len()).unwrap_or(0),
    }
}

async fn deployment_queues(db: &PgPool, kind: AssetKind) -> QueueStatus {
    QueueStatus {
        pending: db::count_networks_by_status(db, kind, DeployStatus::Pending)
            .await
            .unwrap_or(0),
        in_progress: db::count_networks_by_status(db, kind, DeployStatus::InProgress)
            .await
            .unwrap_or(0),
        completed: db::count_networks_by_status(db, kind, DeployStatus::Deployed)
            .await
            .unwrap_or(0),
        errored: db::count_networks_by_status(db, kind, DeployStatus::Failed)
            .await
            .unwrap_or(0),
    }
}

async fn bridge_queues(db: &PgPool, kind: AssetKind) -> QueueStatus {
    let pending = db::count_bridges_by_status(db, kind, BridgeStatus::BridgeInitiated)
        .await
        .unwrap_or(0)
        + db::count_bridges_by_status(db, kind, BridgeStatus::BlockConfirmation)
            .await
            .unwrap_or(0);

    QueueStatus {
        pending,
        in_progress: db::count_bridges_by_status(db, kind, BridgeStatus::InQueue)
            .await
            .unwrap_or(0),
        completed: db::count_bridges_by_status(db, kind, BridgeStatus::BridgeCompleted)
            .await
            .unwrap_or(0),
        errored: db::count_bridges_by_status(db, kind, BridgeStatus::BridgeError)
            .await
            .unwrap_or(0),
    }
}
