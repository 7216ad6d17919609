//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store registered handlers per method
//! - Look up the handler for a request path
//! - Run the handler and map its failures to statuses
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - Lookup tries the full path, then each ancestor up to `/`;
//!   the first registered one wins and the rest becomes `subdir`
//! - O(n) scan per candidate (acceptable for typical route counts)
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::config::ServerConfig;
use crate::http::{HttpResponse, Method, Request, Service, Status};
use crate::observability::metrics;
use crate::routing::handler::{Handler, HandlerError, RequestContext};

struct Route {
    path: String,
    handler: Arc<dyn Handler>,
}

/// Outcome of a route lookup.
pub enum Resolution {
    Matched {
        /// The registered path that matched.
        route: String,
        subdir: String,
        handler: Arc<dyn Handler>,
    },
    NotFound,
    MethodNotAllowed,
}

/// Maps request paths to async handlers.
pub struct Router {
    tables: HashMap<Method, Vec<Route>>,
}

impl Router {
    /// Router accepting GET and POST, with no routes yet.
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(Method::Get, Vec::new());
        tables.insert(Method::Post, Vec::new());
        Self { tables }
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.route(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.route(Method::Post, path, handler)
    }

    /// Register `handler` for `method` at `path`, replacing any previous one.
    pub fn route(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let path = normalize_path(path);
        let handler: Arc<dyn Handler> = Arc::new(handler);
        let table = self.tables.entry(method.clone()).or_default();

        match table.iter_mut().find(|route| route.path == path) {
            Some(existing) => {
                tracing::warn!(method = %method, path = %path, "Route re-registered, replacing handler");
                existing.handler = handler;
            }
            None => {
                tracing::info!(method = %method, path = %path, "Route registered");
                table.push(Route { path, handler });
            }
        }
        self
    }

    /// Registered paths for a method, in registration order.
    pub fn routes(&self, method: &Method) -> Vec<&str> {
        self.tables
            .get(method)
            .map(|table| table.iter().map(|route| route.path.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let Some(table) = self.tables.get(method) else {
            return Resolution::MethodNotAllowed;
        };

        let segments = segments(path);
        for depth in (0..=segments.len()).rev() {
            let candidate = format!("/{}", segments[..depth].join("/"));
            if let Some(route) = table.iter().find(|route| route.path == candidate) {
                return Resolution::Matched {
                    route: candidate,
                    subdir: segments[depth..].join("/"),
                    handler: Arc::clone(&route.handler),
                };
            }
        }

        Resolution::NotFound
    }

    /// Resolve and run the handler for `request`.
    pub async fn dispatch(&self, request: Request) -> HttpResponse {
        let (route, subdir, handler) = match self.resolve(&request.method, request.path()) {
            Resolution::Matched {
                route,
                subdir,
                handler,
            } => (route, subdir, handler),
            Resolution::NotFound => return HttpResponse::new(Status::NOT_FOUND),
            Resolution::MethodNotAllowed => return HttpResponse::new(Status::METHOD_NOT_ALLOWED),
        };

        tracing::debug!(route = %route, subdir = %subdir, "Dispatching");

        let ctx = RequestContext { subdir, request };
        match AssertUnwindSafe(handler.call(ctx)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(HandlerError::Http(err))) => err.into(),
            Ok(Err(HandlerError::Internal(err))) => {
                tracing::error!(route = %route, error = %err, "Handler failed");
                metrics::record_error("handler");
                HttpResponse::new(Status::INTERNAL_SERVER_ERROR)
            }
            Err(_) => {
                tracing::error!(route = %route, "Handler panicked");
                metrics::record_error("handler_panic");
                HttpResponse::new(Status::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for Router {
    fn call<'a>(&'a self, request: Request, _config: &'a ServerConfig) -> BoxFuture<'a, HttpResponse> {
        Box::pin(self.dispatch(request))
    }

    fn advertised_paths(&self) -> Vec<String> {
        self.routes(&Method::Get).into_iter().map(String::from).collect()
    }
}

/// Path components with empty and `.` segments dropped. `..` is kept:
/// it is not resolved here, handlers serving files must sanitize.
fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

fn normalize_path(path: &str) -> String {
    format!("/{}", segments(path).join("/"))
}
