//! Minimal HTTP/1.x server library.
//!
//! Hand-rolled request parsing over raw TCP, a path router for async
//! handlers, and a sandboxed static file service. Two binaries build on it:
//! `minimal-http-server` (static files only) and `demo-api` (router with
//! demo endpoints).

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod static_files;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub mod demo;

pub use config::{CliArgs, ServerConfig};
pub use http::{HttpResponse, HttpServer, Service};
pub use lifecycle::Shutdown;
pub use routing::Router;
pub use static_files::StaticFiles;
