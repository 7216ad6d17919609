//! Demo API server.
//!
//! Same flags as the static file server; registers the demo endpoints and
//! serves the root directory under `/`.

use std::sync::Arc;

use clap::Parser;

use minimal_http_server::demo::demo_router;
use minimal_http_server::lifecycle::startup;
use minimal_http_server::observability::logging;
use minimal_http_server::{CliArgs, StaticFiles};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = args.load_config()?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "demo-api starting");

    let files = StaticFiles::new(&config.static_files.root)
        .await?
        .with_listing(config.static_files.directory_listing);
    let router = demo_router(files);

    startup::serve(config, Arc::new(router), &args).await?;
    Ok(())
}
