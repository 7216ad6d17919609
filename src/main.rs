//! Static file server.
//!
//! Serves a directory over HTTP/1.x with directory listings:
//!
//! ```text
//! minimal-http-server --root ./public --port 8000 --verbose
//! minimal-http-server --config server.toml --watch
//! ```

use std::sync::Arc;

use clap::Parser;

use minimal_http_server::lifecycle::startup;
use minimal_http_server::observability::logging;
use minimal_http_server::{CliArgs, StaticFiles};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = args.load_config()?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "minimal-http-server starting");

    let files = StaticFiles::new(&config.static_files.root)
        .await
        .map_err(|e| format!("cannot serve {}: {}", config.static_files.root.display(), e))?
        .with_listing(config.static_files.directory_listing);

    tracing::info!(
        root = %files.root().display(),
        bind_address = %config.listener.bind_address,
        directory_listing = config.static_files.directory_listing,
        "Configuration loaded"
    );

    startup::serve(config, Arc::new(files), &args).await?;
    Ok(())
}
