//! The seam between the connection loop and whatever answers requests.

use futures_util::future::BoxFuture;

use crate::config::ServerConfig;
use crate::http::{HttpResponse, Request};

/// Produces one response per parsed request.
///
/// Implemented by `Router` (handler-based API server) and by
/// `StaticFiles` (standalone file server). The live config is passed on
/// every call so hot-reloaded settings apply to the next request.
pub trait Service: Send + Sync + 'static {
    fn call<'a>(&'a self, request: Request, config: &'a ServerConfig) -> BoxFuture<'a, HttpResponse>;

    /// GET paths worth printing at startup.
    fn advertised_paths(&self) -> Vec<String> {
        Vec::new()
    }
}
