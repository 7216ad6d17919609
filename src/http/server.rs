//! Connection handling loop.
//!
//! # Responsibilities
//! - Accept connections and spawn one task per connection
//! - Read a single request, ask the `Service` for a response, write it
//! - Apply configuration updates between connections
//! - Stop accepting on shutdown and drain live connections
//!
//! # Design Decisions
//! - One request per connection, always answered with `Connection: close`
//! - Each connection snapshots the config at accept time, so a reload
//!   never changes limits halfway through a request
//! - The listener's bind address is fixed for the server's lifetime

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::http::reader::{read_request, ReadLimits};
use crate::http::request::Version;
use crate::http::response::{HttpResponse, Status};
use crate::http::service::Service;
use crate::net::{ConnectionGuard, ConnectionTracker, Listener, ListenerError};
use crate::observability::{logging, metrics};

pub const X_REQUEST_ID: &str = "X-Request-Id";

/// How long to keep reading after rejecting a request, so the peer sees
/// the error response instead of a reset.
const LINGER: Duration = Duration::from_millis(500);
const LINGER_BYTES: usize = 64 * 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Minimal HTTP/1.x server.
pub struct HttpServer {
    config: Arc<ArcSwap<ServerConfig>>,
    service: Arc<dyn Service>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    pub fn new(config: ServerConfig, service: Arc<dyn Service>) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            service,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.load_full()
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Serve until `shutdown` fires, then wait for live connections.
    pub async fn run(
        self,
        listener: Listener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let address = listener.local_addr()?;
        tracing::info!(address = %address, "HTTP server starting");

        let mut updates_open = true;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Stopping accept loop");
                    break;
                }
                update = config_updates.recv(), if updates_open => match update {
                    Some(config) => self.apply_config(config),
                    None => updates_open = false,
                },
                accepted = listener.accept() => {
                    let (stream, peer_addr, permit) = match accepted {
                        Ok(connection) => connection,
                        Err(ListenerError::Accept(err)) => {
                            tracing::warn!(error = %err, "Accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    };

                    let guard = self.tracker.track();
                    let config = self.config.load_full();
                    let service = Arc::clone(&self.service);
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_connection(stream, peer_addr, guard, service, config).await;
                    });
                }
            }
        }

        drop(listener);

        let grace = Duration::from_secs(self.config.load().timeouts.shutdown_grace_secs);
        let remaining = self.tracker.active_count();
        if remaining > 0 {
            tracing::info!(connections = remaining, grace_secs = grace.as_secs(), "Draining connections");
        }
        if self.tracker.wait_for_drain(grace).await {
            tracing::info!("HTTP server stopped");
        } else {
            tracing::warn!(
                connections = self.tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }
        Ok(())
    }

    /// Swap in a reloaded configuration for connections accepted from now on.
    pub fn apply_config(&self, config: ServerConfig) {
        let current = self.config.load();
        if config.listener != current.listener {
            tracing::warn!(
                bind_address = %config.listener.bind_address,
                max_connections = config.listener.max_connections,
                "Listener settings changed; restart to apply"
            );
        }
        for setting in restart_required(&current, &config) {
            tracing::warn!(setting, "Setting changed; restart to apply");
        }
        let filter_changed = config.observability.log_level != current.observability.log_level
            || config.observability.verbose != current.observability.verbose;
        drop(current);

        if filter_changed && logging::reload_filter(&config.observability) {
            tracing::info!(
                log_level = %config.observability.log_level,
                verbose = config.observability.verbose,
                "Log filter reloaded"
            );
        }
        self.config.store(Arc::new(config));
        tracing::info!("Configuration reloaded");
    }
}

/// Settings other than the listener that only take effect on restart.
fn restart_required(current: &ServerConfig, new: &ServerConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if new.static_files.root != current.static_files.root {
        changed.push("static_files.root");
    }
    if new.observability.log_format != current.observability.log_format {
        changed.push("observability.log_format");
    }
    if new.observability.metrics_enabled != current.observability.metrics_enabled
        || new.observability.metrics_address != current.observability.metrics_address
    {
        changed.push("observability.metrics");
    }
    changed
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    guard: ConnectionGuard,
    service: Arc<dyn Service>,
    config: Arc<ServerConfig>,
) {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "connection",
        conn_id = %guard.id(),
        peer_addr = %peer_addr,
        request_id = %request_id,
    );

    serve_one(stream, peer_addr, request_id, service, config)
        .instrument(span)
        .await;
    drop(guard);
}

async fn serve_one(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    request_id: Uuid,
    service: Arc<dyn Service>,
    config: Arc<ServerConfig>,
) {
    let start = Instant::now();
    let verbose = config.observability.verbose;
    let read_timeout = Duration::from_secs(config.timeouts.read_secs);
    let limits = ReadLimits::from(&config.limits);

    let read = tokio::time::timeout(read_timeout, read_request(&mut stream, limits)).await;

    let mut rejected = false;
    let (version, method, target, response) = match read {
        Err(_) => {
            tracing::debug!(timeout_secs = read_timeout.as_secs(), "Read timed out");
            metrics::record_error("read_timeout");
            rejected = true;
            (Version::Http11, "-".to_string(), "-".to_string(), HttpResponse::new(Status::REQUEST_TIMEOUT))
        }
        Ok(Err(err)) => match err.status() {
            None => {
                tracing::debug!(error = %err, "Connection closed without a request");
                return;
            }
            Some(status) => {
                tracing::warn!(error = %err, status = status.code(), "Rejecting request");
                metrics::record_error(err.kind());
                rejected = true;
                (Version::Http11, "-".to_string(), "-".to_string(), HttpResponse::new(status))
            }
        },
        Ok(Ok(mut request)) => {
            request.peer_addr = Some(peer_addr);
            if verbose {
                tracing::debug!(
                    method = %request.method,
                    target = %request.raw_target,
                    version = %request.version,
                    headers = %request.headers,
                    body_bytes = request.body.len(),
                    "Received"
                );
            }

            let version = request.version.clone();
            let method = request.method.to_string();
            let target = request.raw_target.clone();
            let response = service.call(request, &config).await;
            (version, method, target, response)
        }
    };

    let response = response.with_header(X_REQUEST_ID, request_id.to_string());
    let head = response.head_bytes(&version, &config.response.headers());
    if verbose {
        tracing::debug!(head = %String::from_utf8_lossy(&head), "Responding");
    }

    let write_timeout = Duration::from_secs(config.timeouts.write_secs);
    let write = async {
        stream.write_all(&head).await?;
        stream.write_all(&response.body).await?;
        stream.flush().await?;
        stream.shutdown().await
    };
    match tokio::time::timeout(write_timeout, write).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "Write failed");
            metrics::record_error("write");
        }
        Err(_) => {
            tracing::warn!(timeout_secs = write_timeout.as_secs(), "Write timed out");
            metrics::record_error("write_timeout");
        }
    }

    tracing::info!(
        status = response.status.code(),
        method = %method,
        path = %target,
        bytes = response.body.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "{} {} {}",
        response.status.code(),
        method,
        target
    );
    metrics::record_request(&method, response.status.code(), start);

    if rejected {
        discard_unread(&mut stream).await;
    }
}

/// Read and drop whatever the peer is still sending, briefly.
async fn discard_unread(stream: &mut TcpStream) {
    let drain = async {
        let mut buf = [0u8; 4096];
        let mut total = 0;
        while total < LINGER_BYTES {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => total += n,
            }
        }
    };
    let _ = tokio::time::timeout(LINGER, drain).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Router;

    #[test]
    fn test_restart_required_names_frozen_settings() {
        let current = ServerConfig::default();
        let mut new = current.clone();
        new.static_files.directory_listing = false;
        new.observability.verbose = true;
        new.timeouts.read_secs = 1;
        assert!(restart_required(&current, &new).is_empty());

        new.static_files.root = "/srv/elsewhere".into();
        new.observability.metrics_enabled = !current.observability.metrics_enabled;
        assert_eq!(
            restart_required(&current, &new),
            vec!["static_files.root", "observability.metrics"]
        );
    }

    #[test]
    fn test_apply_config_stores_reload() {
        let server = HttpServer::new(ServerConfig::default(), Arc::new(Router::new()));

        let mut reloaded = ServerConfig::default();
        reloaded.static_files.root = "/srv/elsewhere".into();
        reloaded.observability.verbose = true;
        reloaded.limits.max_body_bytes = 1;
        server.apply_config(reloaded.clone());

        assert_eq!(*server.config(), reloaded);
    }
}
