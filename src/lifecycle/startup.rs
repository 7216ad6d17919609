//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, listener, watcher)
//! - Print the URLs worth visiting
//! - Run the server until a signal arrives, then shut down gracefully
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last among fallible steps, so traffic only arrives
//!   once everything else is ready
//! - Reloaded configs get the command-line overrides re-applied and are
//!   validated again before reaching the server

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::config::{validate_config, CliArgs, ConfigWatcher, ServerConfig};
use crate::http::{HttpServer, ServerError, Service};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),
    #[error("signal handler: {0}")]
    Signal(#[from] std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Bind, serve `service` and block until shutdown completes.
pub async fn serve(
    config: ServerConfig,
    service: Arc<dyn Service>,
    args: &CliArgs,
) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        // validated already
        if let Ok(address) = config.observability.metrics_address.parse() {
            metrics::init_metrics(address)?;
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let address = listener.local_addr().map_err(ListenerError::Bind)?;

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut reloads) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let args = args.clone();
            tokio::spawn(async move {
                while let Some(reloaded) = reloads.recv().await {
                    let config = args.apply(reloaded);
                    if let Err(errors) = validate_config(&config) {
                        for error in &errors {
                            tracing::error!(error = %error, "Reloaded config rejected");
                        }
                        continue;
                    }
                    if updates_tx.send(config).is_err() {
                        break;
                    }
                }
            });
            Some(handle)
        }
        _ => None,
    };

    let paths = service.advertised_paths();
    tracing::info!(address = %address, routes = paths.len(), "Starting at http://{}", address);
    for path in &paths {
        tracing::info!("Available GET: http://{}{}", address, path);
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, service);
    let mut server_task = tokio::spawn(server.run(listener, updates_rx, shutdown.subscribe()));

    tokio::select! {
        signal = wait_for_signal() => signal?,
        finished = &mut server_task => {
            finished??;
            return Ok(());
        }
    }

    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
