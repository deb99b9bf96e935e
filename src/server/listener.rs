use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::net::EndpointSpec;
use crate::server::Service;

/// Binds every configured endpoint and serves until an accept loop fails.
pub async fn run(cfg: &Config, service: Arc<Service>) -> anyhow::Result<()> {
    let endpoints = cfg
        .listening_endpoints()
        .context("parsing listening_ports")?;

    let mut accept_loops = JoinSet::new();
    for endpoint in endpoints {
        if endpoint.tls {
            warn!(addr = %endpoint.addr, "TLS endpoints are not served, skipping");
            continue;
        }

        let listener = TcpListener::bind(endpoint.addr)
            .await
            .with_context(|| format!("binding {}", endpoint.addr))?;
        info!("Listening on {}", listener.local_addr()?);

        accept_loops.spawn(accept_loop(listener, endpoint, cfg.clone(), service.clone()));
    }

    if accept_loops.is_empty() {
        anyhow::bail!("no usable listening endpoint in {:?}", cfg.listening_ports());
    }

    while let Some(res) = accept_loops.join_next().await {
        res.context("accept loop panicked")??;
    }
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    endpoint: EndpointSpec,
    cfg: Config,
    service: Arc<Service>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener
            .accept()
            .await
            .with_context(|| format!("accepting on {}", endpoint.addr))?;
        info!("Accepted connection from {}", peer);

        let local = socket.local_addr().ok();
        let mut conn = Connection::new(socket, &cfg)?.with_addrs(Some(peer), local);
        if let Some(hook) = service.chunk_extension {
            conn = conn.with_extension_hook(Box::new(hook));
        }

        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.run(&service).await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
