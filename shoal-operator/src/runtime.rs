use std::net::SocketAddr;
use std::sync::Arc;

use kube::Client;
use tokio::{task::JoinHandle, try_join};

use crate::{
    config::OperatorConfig, controller::run_controller, ready::ReadinessFile,
    web::run_http_server,
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &OperatorConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the Kubernetes controller loop.
pub fn spawn_controller(
    client: Client,
    cfg: OperatorConfig,
    ready: Arc<ReadinessFile>,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg, ready).await })
}

/// Spawn the health/readiness HTTP server on the provided address.
pub fn spawn_http(
    addr: SocketAddr,
    ready: Arc<ReadinessFile>,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, ready).await })
}

/// Start controller and HTTP surface and wait until either finishes.
pub async fn run_all(client: Client, cfg: OperatorConfig) -> anyhow::Result<()> {
    let http_addr = compute_http_addr(&cfg);
    let ready = Arc::new(ReadinessFile::new(cfg.ready_file.clone()));
    // A marker left by a previous run is stale until a pass completes.
    ready.unset()?;

    let controller = spawn_controller(client, cfg, ready.clone());
    let http = spawn_http(http_addr, ready);

    let (c_res, h_res) = try_join!(controller, http)?;
    c_res?;
    h_res?;
    Ok(())
}
