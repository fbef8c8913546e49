//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::deploy::{Deployer, ScriptRunner};
use crate::errors::HookError;
use crate::logs::flush_logs;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the deploy hook until `shutdown_signal` resolves
pub async fn run(
    version: String,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HookError> {
    info!("Initializing deploy hook v{}...", version);

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let server_state = init_server_state(&options);

    if let Err(e) = init_socket_server(
        &options,
        server_state,
        &mut shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await
    {
        error!("Failed to start deploy hook: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down gracefully...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

fn init_server_state(options: &AppOptions) -> Arc<ServerState> {
    let runner = Arc::new(ScriptRunner::new(options.deploy.clone()));
    let deployer = Arc::new(Deployer::new(runner));
    let state = ServerState::new(options.webhook.clone(), deployer);

    if state.verifier.is_dev_mode() {
        warn!("WARNING: Please set GITHUB_WEBHOOK_SECRET environment variable for production use");
    }
    if options.deploy.timeout.is_none() {
        warn!("Deploy timeout disabled; a hung deploy script blocks all further deployments");
    }

    Arc::new(state)
}

async fn init_socket_server(
    options: &AppOptions,
    server_state: Arc<ServerState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), HookError> {
    info!("Initializing HTTP server...");

    let server_handle = serve(&options.server, server_state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    socket_server_handle: Option<JoinHandle<Result<(), HookError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            socket_server_handle: None,
        }
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), HookError>>,
    ) -> Result<(), HookError> {
        if self.socket_server_handle.is_some() {
            return Err(HookError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), HookError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                flush_logs();
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), HookError> {
        info!("Shutting down deploy hook...");

        // Stops accepting, then drains in-flight requests
        if let Some(handle) = self.socket_server_handle.take() {
            handle.await.map_err(|e| HookError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
