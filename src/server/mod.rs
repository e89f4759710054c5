pub mod handler;

use crate::{Config, Error, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use handler::LitReviewServerHandler;

/// MCP server on the stdio transport
pub struct Server {
    config: Arc<Config>,
    cancellation_token: CancellationToken,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::new_with_arc(Arc::new(config))
    }

    #[must_use]
    pub fn new_with_arc(config: Arc<Config>) -> Self {
        Self {
            config,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Serve until the client disconnects or SIGINT/SIGTERM arrives
    pub async fn run(&self) -> Result<()> {
        info!("Starting MCP server on stdio transport");
        let handler = LitReviewServerHandler::new(Arc::clone(&self.config))?;

        let shutdown_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(signal) => info!("Received {}, initiating graceful shutdown", signal),
                Err(e) => error!("Failed to listen for shutdown signals: {}", e),
            }
            shutdown_token.cancel();
        });

        let running = handler
            .serve_with_ct(stdio(), self.cancellation_token.child_token())
            .await
            .map_err(|e| Error::Service(format!("Failed to start MCP server: {e}")))?;

        let waiting = running.waiting();
        tokio::pin!(waiting);

        let quit_reason = tokio::select! {
            result = &mut waiting => result,
            () = self.cancellation_token.cancelled() => {
                let grace = Duration::from_secs(self.config.server.graceful_shutdown_timeout_secs);
                match tokio::time::timeout(grace, &mut waiting).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Graceful shutdown timeout exceeded, forcing shutdown");
                        return Ok(());
                    }
                }
            }
        }
        .map_err(|e| Error::Service(format!("MCP server error: {e}")))?;

        info!("MCP server stopped: {:?}", quit_reason);
        Ok(())
    }

    pub fn shutdown(&self) {
        warn!("Initiating server shutdown");
        self.cancellation_token.cancel();
    }

    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
