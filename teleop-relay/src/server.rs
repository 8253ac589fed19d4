use crate::signaling::{RelayService, ws_handler};
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Path clients connect their websocket to.
pub const RELAY_PATH: &str = "/ws";

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route(RELAY_PATH, get(ws_handler))
        .with_state(service)
}

/// A bound relay, ready to serve.
pub struct RelayServer {
    listener: TcpListener,
    service: RelayService,
}

impl RelayServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service: RelayService::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// `ws://` URL clients should connect to.
    pub fn url(&self) -> Result<String> {
        Ok(format!("ws://{}{}", self.local_addr()?, RELAY_PATH))
    }

    pub fn service(&self) -> RelayService {
        self.service.clone()
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(CancellationToken::new()).await
    }

    /// Serves until `shutdown` is cancelled.
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<()> {
        info!("Signaling relay listening on {}", self.local_addr()?);
        axum::serve(self.listener, router(self.service))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("Signaling relay stopped");
        Ok(())
    }
}
