//! Web server for usergate.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::auth::AccountService;
use crate::config::ServerConfig;
use crate::{Result, UsergateError};

use super::handlers::AppState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// How long shutdown waits for background tasks.
    shutdown_timeout: Duration,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, service: AccountService) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| UsergateError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(service)),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then let in-flight
    /// requests finish, wait for queued background tasks and close the
    /// database.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        let service = self.app_state.service.clone();
        let router = create_router(self.app_state);

        tracing::info!(addr = %local_addr, "starting server");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutting down server");
            })
            .await?;

        tracing::info!(pending = service.tasks().len(), "completing background tasks");
        if !service.tasks().shutdown(self.shutdown_timeout).await {
            tracing::warn!(
                timeout_secs = self.shutdown_timeout.as_secs(),
                "background tasks did not finish before the shutdown timeout"
            );
        }

        service.db().close().await;
        tracing::info!(addr = %local_addr, "stopped server");
        Ok(())
    }
}

/// Resolve on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "caught signal"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "caught signal"),
    }
}
