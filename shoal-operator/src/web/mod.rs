//! Liveness and readiness endpoints. /healthz is a static liveness probe;
//! /readyz reflects the marker file maintained by the reconcile loop.

use axum::{Router, extract::Extension, http::StatusCode, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ready::ReadinessFile;

pub fn router(ready: Arc<ReadinessFile>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .layer(Extension(ready))
}

async fn readyz(
    Extension(ready): Extension<Arc<ReadinessFile>>,
) -> (StatusCode, &'static str) {
    if ready.is_set() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unready")
    }
}

pub async fn run_http_server(
    addr: SocketAddr,
    ready: Arc<ReadinessFile>,
) -> anyhow::Result<()> {
    let app = router(ready)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
    info!("operator HTTP listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
