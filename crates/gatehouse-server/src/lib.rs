//! Gatehouse API server.
//!
//! Serves the contact collection over HTTP. Every contact operation is
//! authorized through [`gatehouse_authz::AuthzGateway`] against the
//! configured policy decision point before the store is read or changed.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Server builder for constructing and running the API server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let state = AppState::new(&config)?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state.
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone(), &self.config)
    }

    /// Run the server, binding to the configured address.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(%addr, "Server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    /// Get the server's socket address.
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        self.config
            .socket_addr()
            .with_context(|| format!("Invalid bind host `{}`", self.config.server.host))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
