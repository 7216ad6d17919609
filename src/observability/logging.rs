//! Structured logging.
//!
//! `RUST_LOG` takes precedence over the configured filter so a single run
//! can be made noisier without touching the config file. Otherwise the
//! filter sits behind a reload layer and follows config reloads; the
//! output format is fixed at startup.

use std::sync::OnceLock;

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LogFormat, ObservabilityConfig};

/// Set only when the filter comes from the config file.
static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some();
    let (filter, handle) = reload::Layer::new(
        from_env.unwrap_or_else(|| EnvFilter::new(filter_directive(config))),
    );

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init()?,
    }

    if !pinned {
        let _ = FILTER.set(handle);
    }
    Ok(())
}

/// Rebuild the global filter from a reloaded config.
///
/// Returns `false` when there is nothing to swap: logging was not
/// installed by [`init_logging`], or `RUST_LOG` pinned the filter.
pub fn reload_filter(config: &ObservabilityConfig) -> bool {
    let Some(handle) = FILTER.get() else {
        return false;
    };
    match swap_filter(handle, config) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Log filter reload failed");
            false
        }
    }
}

fn swap_filter<S>(
    handle: &reload::Handle<EnvFilter, S>,
    config: &ObservabilityConfig,
) -> Result<(), reload::Error> {
    handle.reload(EnvFilter::new(filter_directive(config)))
}

/// Verbose mode needs debug events from this crate.
fn filter_directive(config: &ObservabilityConfig) -> String {
    if config.verbose {
        format!("{},minimal_http_server=debug", config.log_level)
    } else {
        config.log_level.clone()
    }
}
